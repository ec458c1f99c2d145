//! [`StaticContext`] – the immutable system context.
//!
//! Assembled exactly once at scheduler construction time from the configured
//! persona, rules, examples, action catalogue, and optional external
//! knowledge text.  Shared by `Arc` with the model client so it can cache
//! and reuse the text across calls; the same instance compares and hashes
//! equal for every request in the process lifetime.

/// The one-time system context sent with every model call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StaticContext {
    persona: String,
    rules: String,
    examples: String,
    action_catalogue: String,
    knowledge: Option<String>,
    assembled: String,
}

impl StaticContext {
    /// Assemble the context.  Section headers are fixed so the model sees a
    /// stable layout regardless of configuration.
    pub fn new(
        persona: impl Into<String>,
        rules: impl Into<String>,
        examples: impl Into<String>,
        action_catalogue: impl Into<String>,
        knowledge: Option<String>,
    ) -> Self {
        let persona = persona.into();
        let rules = rules.into();
        let examples = examples.into();
        let action_catalogue = action_catalogue.into();

        let mut assembled = String::new();
        push_section(&mut assembled, "Persona", &persona);
        push_section(&mut assembled, "Rules", &rules);
        push_section(&mut assembled, "Examples", &examples);
        push_section(&mut assembled, "Actions", &action_catalogue);
        if let Some(ref knowledge) = knowledge {
            push_section(&mut assembled, "Knowledge", knowledge);
        }

        Self {
            persona,
            rules,
            examples,
            action_catalogue,
            knowledge,
            assembled: assembled.trim_end().to_string(),
        }
    }

    /// The full assembled context text.
    pub fn text(&self) -> &str {
        &self.assembled
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn action_catalogue(&self) -> &str {
        &self.action_catalogue
    }

    pub fn has_knowledge(&self) -> bool {
        self.knowledge.is_some()
    }
}

fn push_section(out: &mut String, title: &str, body: &str) {
    let body = body.trim();
    if body.is_empty() {
        return;
    }
    out.push_str("## ");
    out.push_str(title);
    out.push('\n');
    out.push_str(body);
    out.push_str("\n\n");
}

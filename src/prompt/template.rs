use super::engine::TeraEngine;
use crate::error::PromptError;
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumIter, IntoEnumIterator};

/// Named placeholder a prompt template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Slot {
    DisplayName,
    ServerName,
    MemberCount,
    RecentActivity,
    Message,
    Keywords,
    History,
    LineCount,
    SecretToken,
}

/// Values for one render, keyed by slot.
#[derive(Debug, Clone, Default)]
pub struct SlotValues {
    values: BTreeMap<Slot, String>,
}

impl SlotValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: Slot, value: impl Into<String>) -> Self {
        self.values.insert(slot, value.into());
        self
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.values.get(&slot).map(String::as_str)
    }
}

/// A prompt template whose placeholders are checked against a declared slot
/// list when it is built.
///
/// Construction renders the template once with every declared slot filled;
/// Tera runs in strict mode, so any `{{ name }}` outside the declared set fails
/// there instead of leaking to the generation service later.
pub struct PromptTemplate {
    name: String,
    slots: Vec<Slot>,
    engine: TeraEngine,
}

impl std::fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("name", &self.name)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl PromptTemplate {
    pub fn new(name: &str, source: &str, slots: &[Slot]) -> Result<Self, PromptError> {
        let mut engine = TeraEngine::new();
        engine.add_template(name, source)?;

        let template = Self {
            name: name.to_string(),
            slots: slots.to_vec(),
            engine,
        };

        let probe = slots
            .iter()
            .fold(SlotValues::new(), |values, slot| values.with(*slot, "probe"));
        if let Err(err) = template.engine.render(name, &template.context(&probe)) {
            return Err(PromptError::UndeclaredSlot {
                template: name.to_string(),
                message: err.to_string(),
            });
        }

        Ok(template)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Render with every declared slot filled. Values are inserted as data and
    /// never re-parsed as template syntax.
    pub fn render(&self, values: &SlotValues) -> Result<String, PromptError> {
        if let Some(missing) = self.slots.iter().find(|slot| values.get(**slot).is_none()) {
            return Err(PromptError::MissingSlot {
                template: self.name.clone(),
                slot: missing.to_string(),
            });
        }
        self.engine.render(&self.name, &self.context(values))
    }

    fn context(&self, values: &SlotValues) -> tera::Context {
        let mut ctx = tera::Context::new();
        for slot in Slot::iter().filter(|slot| self.slots.contains(slot)) {
            if let Some(value) = values.get(slot) {
                ctx.insert(slot.as_ref(), value);
            }
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_declared_slots() {
        let template =
            PromptTemplate::new("hello", "watching {{ display_name }}...", &[Slot::DisplayName])
                .unwrap();
        let out = template
            .render(&SlotValues::new().with(Slot::DisplayName, "mira"))
            .unwrap();
        assert_eq!(out, "watching mira...");
    }

    #[test]
    fn undeclared_placeholder_fails_at_construction() {
        let err = PromptTemplate::new("bad", "hi {{ username }}", &[Slot::DisplayName]).unwrap_err();
        assert!(matches!(err, PromptError::UndeclaredSlot { .. }));
    }

    #[test]
    fn declared_but_unused_slot_is_fine() {
        let template = PromptTemplate::new("plain", "no slots here", &[Slot::Keywords]).unwrap();
        let out = template
            .render(&SlotValues::new().with(Slot::Keywords, ""))
            .unwrap();
        assert_eq!(out, "no slots here");
    }

    #[test]
    fn missing_value_fails_at_render() {
        let template =
            PromptTemplate::new("hello", "{{ display_name }}", &[Slot::DisplayName]).unwrap();
        let err = template.render(&SlotValues::new()).unwrap_err();
        assert!(
            matches!(err, PromptError::MissingSlot { ref slot, .. } if slot == "display_name")
        );
    }

    #[test]
    fn slot_values_are_not_reinterpreted() {
        let template = PromptTemplate::new("echo", "{{ message }}", &[Slot::Message]).unwrap();
        let out = template
            .render(&SlotValues::new().with(Slot::Message, "{{ display_name }}"))
            .unwrap();
        assert_eq!(out, "{{ display_name }}");
    }

    #[test]
    fn conditional_on_empty_slot_renders_nothing() {
        let template = PromptTemplate::new(
            "cond",
            "base{% if secret_token %} [{{ secret_token }}]{% endif %}",
            &[Slot::SecretToken],
        )
        .unwrap();
        let off = template
            .render(&SlotValues::new().with(Slot::SecretToken, ""))
            .unwrap();
        let on = template
            .render(&SlotValues::new().with(Slot::SecretToken, "KHOOR"))
            .unwrap();
        assert_eq!(off, "base");
        assert_eq!(on, "base [KHOOR]");
    }
}

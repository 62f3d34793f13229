use crate::error::PromptError;
use tera::Tera;

/// Tera-backed template engine for building persona prompts.
pub struct TeraEngine {
    tera: Tera,
}

impl TeraEngine {
    /// Create with inline templates (no filesystem).
    pub fn new() -> Self {
        let mut tera = Tera::default();
        // Prompts are plain text; never HTML-escape slot values.
        tera.autoescape_on(vec![]);
        Self { tera }
    }

    /// Register a template from a string.
    pub fn add_template(&mut self, name: &str, content: &str) -> Result<(), PromptError> {
        self.tera
            .add_raw_template(name, content)
            .map_err(|e| PromptError::Parse {
                template: name.to_string(),
                message: flatten(&e),
            })
    }

    /// Render a named template with the given context.
    pub fn render(&self, template_name: &str, context: &tera::Context) -> Result<String, PromptError> {
        self.tera
            .render(template_name, context)
            .map_err(|e| PromptError::Render(flatten(&e)))
    }
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Tera nests the useful message in `source()`; join the chain.
fn flatten(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = std::error::Error::source(inner);
    }
    message
}

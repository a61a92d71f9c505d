use minijinja::{context, Environment, UndefinedBehavior};

/// Schema description embedded in the generation instructions.
pub const FULL_SCHEMA: &str = include_str!("../templates/schema/full.md");

/// Narrower description used when explaining a query. Must agree with `FULL_SCHEMA`.
pub const CONDENSED_SCHEMA: &str = include_str!("../templates/schema/condensed.md");

const TEMPLATES: [(&str, &str); 6] = [
    ("generate_system.txt", include_str!("../templates/generate_system.txt")),
    ("generate_prompt.txt", include_str!("../templates/generate_prompt.txt")),
    ("explain_system.txt", include_str!("../templates/explain_system.txt")),
    ("explain_prompt.txt", include_str!("../templates/explain_prompt.txt")),
    ("chart_system.txt", include_str!("../templates/chart_system.txt")),
    ("chart_prompt.txt", include_str!("../templates/chart_prompt.txt")),
];

/// A rendered system instruction plus task prompt.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub prompt: String,
}

pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }

        Ok(Self { env })
    }

    pub fn generation(&self, question: &str) -> Result<Prompt, minijinja::Error> {
        self.render_pair(
            "generate",
            context! { schema => FULL_SCHEMA, question => question },
        )
    }

    pub fn explanation(&self, question: &str, query: &str) -> Result<Prompt, minijinja::Error> {
        self.render_pair(
            "explain",
            context! { schema => CONDENSED_SCHEMA, question => question, query => query },
        )
    }

    /// `rows` is the already serialized result set.
    pub fn chart(&self, question: &str, rows: &str) -> Result<Prompt, minijinja::Error> {
        self.render_pair("chart", context! { question => question, rows => rows })
    }

    fn render_pair(
        &self,
        stage: &str,
        ctx: minijinja::Value,
    ) -> Result<Prompt, minijinja::Error> {
        let system = self
            .env
            .get_template(&format!("{}_system.txt", stage))?
            .render(&ctx)?;
        let prompt = self
            .env
            .get_template(&format!("{}_prompt.txt", stage))?
            .render(&ctx)?;

        Ok(Prompt { system, prompt })
    }
}

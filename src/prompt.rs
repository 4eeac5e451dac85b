//! Prompt templates.
//!
//! The default prompts live in `src/prompts/*.txt` and are embedded at compile
//! time with `include_str!`, so they can be edited without dealing with Rust
//! string syntax. Placeholders are written `{{name}}`.

use thiserror::Error;

use crate::model::FridgeContents;

/// Instruction for the vision model
pub const ANALYSE_FRIDGE_PROMPT: &str = include_str!("prompts/analyse_fridge.txt");

/// Instruction for the recipe model; expects `meal_type`, `cuisine` and `ingredients`
pub const GENERATE_RECIPE_PROMPT: &str = include_str!("prompts/generate_recipe.txt");

/// Instruction for the image model; expects `recipe`
pub const ILLUSTRATE_RECIPE_PROMPT: &str = include_str!("prompts/illustrate_recipe.txt");

/// Bullet used when nothing edible was recognized
const NO_INGREDIENTS: &str = "- (no ingredients were recognized, suggest something from pantry staples)";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{{name}}` placeholder had no value
    #[error("no value for template variable '{0}'")]
    MissingVariable(String),
    /// `{{` without a matching `}}`
    #[error("unclosed placeholder at byte {0}")]
    Unclosed(usize),
}

/// A prompt with `{{name}}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        PromptTemplate { text: text.into() }
    }

    pub fn analyse_fridge() -> Self {
        PromptTemplate::new(ANALYSE_FRIDGE_PROMPT.trim_end())
    }

    pub fn generate_recipe() -> Self {
        PromptTemplate::new(GENERATE_RECIPE_PROMPT.trim_end())
    }

    pub fn illustrate_recipe() -> Self {
        PromptTemplate::new(ILLUSTRATE_RECIPE_PROMPT.trim_end())
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Names of all placeholders, in order of appearance
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.text.as_str();
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            match after.find("}}") {
                Some(end) => {
                    names.push(after[..end].trim());
                    rest = &after[end + 2..];
                }
                None => break,
            }
        }
        names
    }

    /// Substitute every placeholder with its value from `vars`.
    ///
    /// Values are inserted verbatim; placeholders inside values are not expanded.
    pub fn render(&self, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
        let mut output = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        let mut offset = 0;

        while let Some(start) = rest.find("{{") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or(TemplateError::Unclosed(offset + start))?;
            let name = after[..end].trim();
            let value = vars
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| TemplateError::MissingVariable(name.to_string()))?;
            output.push_str(value);

            let consumed = start + 2 + end + 2;
            offset += consumed;
            rest = &rest[consumed..];
        }
        output.push_str(rest);

        Ok(output)
    }
}

/// One bullet per item, in extraction order, duplicates included
pub fn ingredient_bullets(contents: &FridgeContents) -> String {
    if contents.is_empty() {
        return NO_INGREDIENTS.to_string();
    }
    contents
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FridgeItem;

    #[test]
    fn test_prompts_are_embedded() {
        assert!(ANALYSE_FRIDGE_PROMPT.contains("which items of food can be seen"));
        assert!(ILLUSTRATE_RECIPE_PROMPT.starts_with("Photo of the final result"));
    }

    #[test]
    fn test_default_placeholders() {
        assert!(PromptTemplate::analyse_fridge().placeholders().is_empty());
        assert_eq!(
            PromptTemplate::generate_recipe().placeholders(),
            vec!["meal_type", "cuisine", "ingredients"]
        );
        assert_eq!(
            PromptTemplate::illustrate_recipe().placeholders(),
            vec!["recipe"]
        );
    }

    #[test]
    fn test_render() {
        let template = PromptTemplate::new("Make {{ meal_type }} in the {{cuisine}} style.");
        let text = template
            .render(&[("meal_type", "dinner"), ("cuisine", "italian")])
            .unwrap();
        assert_eq!(text, "Make dinner in the italian style.");
    }

    #[test]
    fn test_render_does_not_expand_values() {
        let template = PromptTemplate::new("Recipe: {{recipe}}");
        let text = template.render(&[("recipe", "{{cuisine}}")]).unwrap();
        assert_eq!(text, "Recipe: {{cuisine}}");
    }

    #[test]
    fn test_render_errors() {
        let template = PromptTemplate::new("Make {{meal_type}}");
        assert_eq!(
            template.render(&[]),
            Err(TemplateError::MissingVariable("meal_type".to_string()))
        );

        let template = PromptTemplate::new("ok {{meal_type}} then {{broken");
        assert_eq!(
            template.render(&[("meal_type", "x")]),
            Err(TemplateError::Unclosed(22))
        );
    }

    #[test]
    fn test_render_error_messages() {
        assert_eq!(
            TemplateError::MissingVariable("cuisine".to_string()).to_string(),
            "no value for template variable 'cuisine'"
        );
        assert_eq!(
            TemplateError::Unclosed(4).to_string(),
            "unclosed placeholder at byte 4"
        );
    }

    #[test]
    fn test_ingredient_bullets() {
        let contents = FridgeContents::new(vec![
            FridgeItem::new("egg", 6),
            FridgeItem::new("spinach", 1),
            FridgeItem::new("egg", 2),
        ]);
        assert_eq!(
            ingredient_bullets(&contents),
            "- egg (6)\n- spinach (1)\n- egg (2)"
        );
    }

    #[test]
    fn test_ingredient_bullets_empty() {
        let bullets = ingredient_bullets(&FridgeContents::default());
        assert!(bullets.starts_with("- "));
        assert!(bullets.contains("no ingredients"));
    }
}

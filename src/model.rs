use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ChefError;

/// One distinguishable food or beverage item seen in the photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FridgeItem {
    /// What the item is, as specific as the model could tell (e.g. "red bell pepper")
    pub title: String,
    /// How many of this item can be seen, at least
    pub quantity: u32,
}

impl FridgeItem {
    pub fn new(title: impl Into<String>, quantity: u32) -> Self {
        FridgeItem {
            title: title.into(),
            quantity,
        }
    }
}

impl fmt::Display for FridgeItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.quantity)
    }
}

/// Items in the order the model listed them.
///
/// Duplicate titles are kept as separate entries and the list may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FridgeContents(Vec<FridgeItem>);

impl FridgeContents {
    pub fn new(items: Vec<FridgeItem>) -> Self {
        FridgeContents(items)
    }

    pub fn items(&self) -> &[FridgeItem] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FridgeItem> {
        self.0.iter()
    }

    pub fn into_items(self) -> Vec<FridgeItem> {
        self.0
    }
}

impl From<Vec<FridgeItem>> for FridgeContents {
    fn from(items: Vec<FridgeItem>) -> Self {
        FridgeContents(items)
    }
}

impl IntoIterator for FridgeContents {
    type Item = FridgeItem;
    type IntoIter = std::vec::IntoIter<FridgeItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FridgeContents {
    type Item = &'a FridgeItem;
    type IntoIter = std::slice::Iter<'a, FridgeItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// What kind of meal to cook and in which style
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPreferences {
    /// e.g. breakfast, lunch, dinner, dessert
    pub meal_type: String,
    /// e.g. italian, korean, junk food
    pub cuisine: String,
}

impl MealPreferences {
    /// Create preferences, trimming both values and rejecting empty ones
    pub fn new(meal_type: impl Into<String>, cuisine: impl Into<String>) -> Result<Self, ChefError> {
        let meal_type = meal_type.into().trim().to_string();
        let cuisine = cuisine.into().trim().to_string();

        if meal_type.is_empty() {
            return Err(ChefError::InvalidInput(
                "Meal type cannot be empty".to_string(),
            ));
        }
        if cuisine.is_empty() {
            return Err(ChefError::InvalidInput("Cuisine cannot be empty".to_string()));
        }

        Ok(MealPreferences { meal_type, cuisine })
    }
}

/// Final output of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeResult {
    /// Recipe text as written by the model
    pub recipe: String,
    /// Picture of the finished dish, when illustration ran and succeeded
    #[serde(rename = "resultImage", skip_serializing_if = "Option::is_none", default)]
    pub result_image: Option<String>,
}

/// Image bytes together with their media type
#[derive(Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl InlineImage {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        InlineImage {
            content_type: content_type.into(),
            bytes,
        }
    }

    /// `data:<content-type>;base64,<payload>`
    pub fn data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

// Image payloads can be megabytes; keep them out of debug logs.
impl fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineImage")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Split a base64 data URI into its media type and payload.
///
/// Returns `None` for anything that is not `data:<type>;base64,<payload>`.
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    if media_type.is_empty() {
        return None;
    }
    Some((media_type, payload))
}

//! Landmark record definitions.
//!
//! This module defines the data carried for every point of interest the
//! application lists. The primary model is [`Landmark`], deserialized from the
//! bundled JSON document with camelCase keys. [`Category`] is the closed set
//! of tags used to group landmarks, and [`Coordinates`] is the plain
//! latitude/longitude pair handed to the host's map collaborator.

use serde::{Deserialize, Serialize};

/// Stable identity key of a landmark.
pub type LandmarkId = u32;

/// The closed set of landmark categories.
///
/// Serialized with exactly the strings `"Lakes"`, `"Rivers"` and
/// `"Mountains"`. Any other string fails deserialization, so a seed document
/// with an unknown category is rejected as a whole.
///
/// The `Ord` derive gives categories a stable order for grouped views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Lakes,
    Rivers,
    Mountains,
}

impl Category {
    /// All categories, in display order.
    pub const ALL: [Category; 3] = [Category::Lakes, Category::Rivers, Category::Mountains];

    /// The serialized name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Lakes => "Lakes",
            Category::Rivers => "Rivers",
            Category::Mountains => "Mountains",
        }
    }
}

/// A geographic position in floating point degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// One point of interest with display metadata and a favorite flag.
///
/// # Structure
///
/// - **id**: unique, stable identity; never reassigned after load
/// - **name / park / state / city**: display strings
/// - **category**: one of [`Category`]
/// - **coordinates**: passed as-is to the host's map view
/// - **image_name**: opaque handle the host resolves to a bundled image
/// - **is_favorite**: the only field mutated after load
/// - **is_featured**: marks landmarks shown in the featured row
///
/// # Examples
///
/// ```rust
/// use landmark_core::landmark::{Category, Landmark};
///
/// let json = r#"{
///     "id": 1001,
///     "name": "Turtle Rock",
///     "park": "Joshua Tree National Park",
///     "state": "California",
///     "category": "Rivers",
///     "coordinates": { "latitude": 34.011286, "longitude": -116.166868 },
///     "imageName": "turtlerock",
///     "isFavorite": true
/// }"#;
///
/// let landmark: Landmark = serde_json::from_str(json)?;
/// assert_eq!(landmark.category, Category::Rivers);
/// assert!(landmark.is_favorite);
/// assert!(!landmark.is_featured);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Landmark {
    pub id: LandmarkId,
    pub name: String,
    pub park: String,
    pub state: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub coordinates: Coordinates,
    pub image_name: String,
    pub is_favorite: bool,
    #[serde(default)]
    pub is_featured: bool,
}

impl Landmark {
    /// Name of the bundled image shown in the featured row, distinct from the
    /// square thumbnail referenced by `image_name`.
    pub fn feature_image_name(&self) -> Option<String> {
        self.is_featured.then(|| format!("{}_feature", self.image_name))
    }
}

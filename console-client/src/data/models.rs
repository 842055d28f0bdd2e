use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::Endpoints;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Categories,
    Subcategories,
    Products,
    Couriers,
}

impl Resource {
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Categories => "category",
            Resource::Subcategories => "subcategory",
            Resource::Products => "product",
            Resource::Couriers => "courier",
        }
    }

    pub fn endpoint<'a>(&self, endpoints: &'a Endpoints) -> &'a str {
        match self {
            Resource::Categories => &endpoints.categories,
            Resource::Subcategories => &endpoints.subcategories,
            Resource::Products => &endpoints.products,
            Resource::Couriers => &endpoints.couriers,
        }
    }
}

/// A record the console manages through CRUD screens.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const RESOURCE: Resource;

    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subcategory {
    pub id: String,
    pub name: String,
    pub category_id: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub subcategory_id: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Courier {
    pub id: String,
    pub name: String,
    pub login: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub cities: Vec<String>,
}

impl Record for Category {
    const RESOURCE: Resource = Resource::Categories;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Subcategory {
    const RESOURCE: Resource = Resource::Subcategories;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Product {
    const RESOURCE: Resource = Resource::Products;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Courier {
    const RESOURCE: Resource = Resource::Couriers;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Response of the image upload endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedImage {
    pub filename: String,
}

// Copyright 2023 Remi Bernotavicius

use derive_more::Display;
use diesel::associations::{Associations, Identifiable};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::{AsChangeset, Insertable};
use diesel_derive_enum::DbEnum;
use diesel_derive_newtype::DieselNewType;
use strum::{EnumIter, EnumString};

/// Image reference stored on recipes that never had a picture uploaded.
pub const DEFAULT_IMAGE: &str = "default.jpg";

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct CategoryId(pub i32);

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::categories)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct TagId(pub i32);

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::tags)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Display, EnumIter, EnumString, Hash, Copy, Clone, PartialEq, Eq, DbEnum)]
pub enum UnitOfMeasure {
    #[display("g")]
    #[strum(serialize = "g")]
    #[db_rename = "g"]
    Grams,
    #[display("kg")]
    #[strum(serialize = "kg")]
    #[db_rename = "kg"]
    Kilograms,
    #[display("ml")]
    #[strum(serialize = "ml")]
    #[db_rename = "ml"]
    Milliliters,
    #[display("l")]
    #[strum(serialize = "l")]
    #[db_rename = "l"]
    Liters,
    #[display("ts")]
    #[strum(serialize = "ts")]
    #[db_rename = "ts"]
    Teaspoons,
    #[display("tbs")]
    #[strum(serialize = "tbs")]
    #[db_rename = "tbs"]
    Tablespoons,
    #[display("pcs")]
    #[strum(serialize = "pcs")]
    #[db_rename = "pcs"]
    Pieces,
}

impl UnitOfMeasure {
    pub fn iter() -> impl Iterator<Item = Self> {
        <Self as strum::IntoEnumIterator>::iter()
    }
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct IngredientId(pub i32);

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub unit: UnitOfMeasure,
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct RecipeId(pub i32);

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub author: String,
    pub intro: String,
    pub description: String,
    pub directions: String,
    pub prep_time: i32,
    pub cook_time: i32,
    pub servings: i32,
    pub image: String,
    pub published: bool,
    pub category_id: Option<CategoryId>,
    pub rating: f64,
    pub rating_count: i32,
}

impl Recipe {
    /// The aggregate rating, or `None` while nobody has rated the recipe.
    pub fn average_rating(&self) -> Option<f64> {
        (self.rating_count > 0).then_some(self.rating)
    }

    pub fn to_handle(&self) -> RecipeHandle {
        RecipeHandle {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeHandle {
    pub id: RecipeId,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipeRow<'a> {
    pub name: &'a str,
    pub author: &'a str,
    pub intro: &'a str,
    pub description: &'a str,
    pub directions: &'a str,
    pub prep_time: i32,
    pub cook_time: i32,
    pub servings: i32,
    pub image: &'a str,
    pub published: bool,
    pub category_id: Option<CategoryId>,
    pub rating: f64,
    pub rating_count: i32,
}

/// Column changes for a partial recipe update; `None` leaves a column alone.
#[derive(AsChangeset, Default, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub author: Option<String>,
    pub intro: Option<String>,
    pub description: Option<String>,
    pub directions: Option<String>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub image: Option<String>,
    pub published: Option<bool>,
    pub category_id: Option<Option<CategoryId>>,
}

impl RecipeChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct RecipeIngredientId(pub i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Recipe))]
#[diesel(belongs_to(Ingredient))]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub position: i32,
    pub quantity: f32,
    pub alternate_quantity: Option<f32>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct NewRecipeIngredientRow {
    pub recipe_id: RecipeId,
    pub ingredient_id: IngredientId,
    pub position: i32,
    pub quantity: f32,
    pub alternate_quantity: Option<f32>,
}

#[derive(Insertable, Queryable, Selectable, Debug, Clone, Copy, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::recipe_tags)]
pub struct RecipeTag {
    pub recipe_id: RecipeId,
    pub tag_id: TagId,
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct UserId(pub i32);

#[derive(Queryable, Selectable, Identifiable, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::users)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::users)]
pub struct NewUserRow<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[derive(AsChangeset, Default, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::users)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct SettingId(pub i32);

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::settings)]
pub struct Setting {
    pub id: SettingId,
    pub name: String,
    pub value: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::user_settings)]
pub struct UserSetting {
    pub user_id: UserId,
    pub setting_id: SettingId,
    pub position: i32,
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct UserRecipeId(pub i32);

/// One user's personal rating and plan for one recipe. A rating of `0` means unrated.
#[derive(Associations, Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Recipe))]
#[diesel(table_name = crate::database::schema::user_recipes)]
pub struct UserRecipe {
    pub id: UserRecipeId,
    pub user_id: UserId,
    pub recipe_id: RecipeId,
    pub rating: i32,
    pub planned_for: Option<chrono::NaiveDate>,
}

impl UserRecipe {
    pub const UNRATED: i32 = 0;

    pub fn is_rated(&self) -> bool {
        self.rating != Self::UNRATED
    }
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
pub struct MealId(pub i32);

/// A `meals` row as stored. Use `crate::meals::Meal` for the checked form.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::meals)]
pub struct MealRow {
    pub id: MealId,
    pub day: chrono::NaiveDate,
    pub recipe_id: Option<RecipeId>,
    pub name: Option<String>,
    pub note: Option<String>,
    pub servings: Option<i32>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::meals)]
pub struct NewMealRow<'a> {
    pub day: chrono::NaiveDate,
    pub recipe_id: Option<RecipeId>,
    pub name: Option<&'a str>,
    pub note: Option<&'a str>,
    pub servings: Option<i32>,
}

diesel::table! {
    categories (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    ingredients (id) {
        id -> Integer,
        name -> Text,
        unit -> crate::database::models::UnitOfMeasureMapping,
    }
}

diesel::table! {
    meals (id) {
        id -> Integer,
        day -> Date,
        recipe_id -> Nullable<Integer>,
        name -> Nullable<Text>,
        note -> Nullable<Text>,
        servings -> Nullable<Integer>,
    }
}

diesel::table! {
    recipe_ingredients (id) {
        id -> Integer,
        recipe_id -> Integer,
        ingredient_id -> Integer,
        position -> Integer,
        quantity -> Float,
        alternate_quantity -> Nullable<Float>,
    }
}

diesel::table! {
    recipe_tags (recipe_id, tag_id) {
        recipe_id -> Integer,
        tag_id -> Integer,
    }
}

diesel::table! {
    recipes (id) {
        id -> Integer,
        name -> Text,
        author -> Text,
        intro -> Text,
        description -> Text,
        directions -> Text,
        prep_time -> Integer,
        cook_time -> Integer,
        servings -> Integer,
        image -> Text,
        published -> Bool,
        category_id -> Nullable<Integer>,
        rating -> Double,
        rating_count -> Integer,
    }
}

diesel::table! {
    settings (id) {
        id -> Integer,
        name -> Text,
        value -> Text,
    }
}

diesel::table! {
    tags (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    user_recipes (id) {
        id -> Integer,
        user_id -> Integer,
        recipe_id -> Integer,
        rating -> Integer,
        planned_for -> Nullable<Date>,
    }
}

diesel::table! {
    user_settings (user_id, setting_id) {
        user_id -> Integer,
        setting_id -> Integer,
        position -> Integer,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        name -> Text,
        email -> Text,
        password_hash -> Text,
    }
}

diesel::joinable!(meals -> recipes (recipe_id));
diesel::joinable!(recipe_ingredients -> ingredients (ingredient_id));
diesel::joinable!(recipe_ingredients -> recipes (recipe_id));
diesel::joinable!(recipe_tags -> recipes (recipe_id));
diesel::joinable!(recipe_tags -> tags (tag_id));
diesel::joinable!(recipes -> categories (category_id));
diesel::joinable!(user_recipes -> recipes (recipe_id));
diesel::joinable!(user_recipes -> users (user_id));
diesel::joinable!(user_settings -> settings (setting_id));
diesel::joinable!(user_settings -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    categories,
    ingredients,
    meals,
    recipe_ingredients,
    recipe_tags,
    recipes,
    settings,
    tags,
    user_recipes,
    user_settings,
    users,
);

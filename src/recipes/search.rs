// Copyright 2023 Remi Bernotavicius

use super::like_pattern;
use crate::database;
use crate::database::models::Recipe;
use crate::Result;
use diesel::expression_methods::EscapeExpressionMethods as _;
use diesel::expression_methods::NullableExpressionMethods as _;
use diesel::expression_methods::TextExpressionMethods as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

/// What the recipe list is narrowed down to. Empty parts do not filter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Every whitespace separated word must appear in the recipe name, ignoring case.
    pub query: String,
    /// The recipe's category name must be one of these.
    pub categories: Vec<String>,
    /// At least one of the recipe's tags must be one of these.
    pub tags: Vec<String>,
}

impl RecipeFilter {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn categories<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.categories = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn tags<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.tags = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Recipes passing every part of `filter`, ordered by name.
pub fn search(conn: &mut database::Connection, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
    use database::schema::{categories, recipe_tags, recipes, tags};

    let mut query = recipes::table.select(Recipe::as_select()).into_boxed();

    for token in filter.query.split_whitespace() {
        query = query.filter(recipes::name.like(like_pattern(token)).escape('\\'));
    }

    if !filter.categories.is_empty() {
        let in_categories = categories::table
            .filter(categories::name.eq_any(filter.categories.clone()))
            .select(categories::id.nullable());
        query = query.filter(recipes::category_id.eq_any(in_categories));
    }

    if !filter.tags.is_empty() {
        let tagged = recipe_tags::table
            .inner_join(tags::table)
            .filter(tags::name.eq_any(filter.tags.clone()))
            .select(recipe_tags::recipe_id);
        query = query.filter(recipes::id.eq_any(tagged));
    }

    let found = query
        .order_by((recipes::name, recipes::id))
        .load(conn)?;
    log::debug!("search {filter:?} found {} recipe(s)", found.len());
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::recipes::{create, tests::new_recipe};

    fn names(recipes: Vec<Recipe>) -> Vec<String> {
        recipes.into_iter().map(|r| r.name).collect()
    }

    fn catalog_fixture(conn: &mut database::Connection) {
        let main = catalog::add_category(conn, "Main").unwrap();
        let side = catalog::add_category(conn, "Side dish").unwrap();
        let indian = catalog::add_tag(conn, "Indian").unwrap();
        let lactose = catalog::add_tag(conn, "Lactose free").unwrap();
        let moroccan = catalog::add_tag(conn, "Moroccan").unwrap();
        catalog::add_tag(conn, "Italian").unwrap();

        let mut curry = new_recipe("Fish curry", Some(main.id));
        curry.tags = vec![indian.id, lactose.id];
        create(conn, &curry).unwrap();
        create(conn, &new_recipe("Pasta something", Some(main.id))).unwrap();
        create(conn, &new_recipe("Weekend tajine", Some(main.id))).unwrap();
        let mut zaalouk = new_recipe("Zaalouk", Some(side.id));
        zaalouk.tags = vec![moroccan.id];
        create(conn, &zaalouk).unwrap();
        create(conn, &new_recipe("Curry of the day", None)).unwrap();
        create(conn, &new_recipe("100% fish", None)).unwrap();
    }

    #[test]
    fn every_token_must_match() {
        let mut conn = database::establish_in_memory().unwrap();
        catalog_fixture(&mut conn);

        let found = search(&mut conn, &RecipeFilter::new("fish curry")).unwrap();
        assert_eq!(names(found), ["Fish curry"]);

        let found = search(&mut conn, &RecipeFilter::new("  CURRY ")).unwrap();
        assert_eq!(names(found), ["Curry of the day", "Fish curry"]);

        let found = search(&mut conn, &RecipeFilter::new("sushi")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn wildcards_match_literally() {
        let mut conn = database::establish_in_memory().unwrap();
        catalog_fixture(&mut conn);

        let found = search(&mut conn, &RecipeFilter::new("%")).unwrap();
        assert_eq!(names(found), ["100% fish"]);

        let found = search(&mut conn, &RecipeFilter::new("_")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn category_filter() {
        let mut conn = database::establish_in_memory().unwrap();
        catalog_fixture(&mut conn);

        let found = search(&mut conn, &RecipeFilter::new("").categories(["Main"])).unwrap();
        assert_eq!(
            names(found),
            ["Fish curry", "Pasta something", "Weekend tajine"]
        );

        let found = search(
            &mut conn,
            &RecipeFilter::new("").categories(["Main", "Side dish"]),
        )
        .unwrap();
        assert_eq!(found.len(), 4);

        let found = search(&mut conn, &RecipeFilter::new("").categories(["Desert"])).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn any_tag_matches() {
        let mut conn = database::establish_in_memory().unwrap();
        catalog_fixture(&mut conn);

        let found = search(&mut conn, &RecipeFilter::new("").tags(["Moroccan", "Indian"])).unwrap();
        assert_eq!(names(found), ["Fish curry", "Zaalouk"]);

        let found = search(&mut conn, &RecipeFilter::new("").tags(["Italian"])).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn filters_are_conjunctive() {
        let mut conn = database::establish_in_memory().unwrap();
        catalog_fixture(&mut conn);

        let filter = RecipeFilter::new("curry")
            .categories(["Main"])
            .tags(["Lactose free"]);
        assert_eq!(names(search(&mut conn, &filter).unwrap()), ["Fish curry"]);

        let filter = RecipeFilter::new("curry").categories(["Side dish"]);
        assert!(search(&mut conn, &filter).unwrap().is_empty());

        let filter = RecipeFilter::new("").categories(["Main"]).tags(["Moroccan"]);
        assert!(search(&mut conn, &filter).unwrap().is_empty());

        assert_eq!(search(&mut conn, &RecipeFilter::default()).unwrap().len(), 6);
    }
}

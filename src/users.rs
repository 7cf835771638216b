// Copyright 2023 Remi Bernotavicius

//! Accounts and each user's personal ledger of rated and planned recipes.

use crate::database;
use crate::database::models::{
    NewUserRow, RecipeId, User, UserChanges, UserId, UserRecipe,
};
use crate::error::conflict_or;
use crate::{Error, Result};
use diesel::prelude::OptionalExtension as _;
use diesel::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(field, "must not be empty"));
    }
    Ok(value)
}

pub fn register(
    conn: &mut database::Connection,
    new_name: &str,
    new_email: &str,
    password: &str,
    hash_cost: u32,
) -> Result<User> {
    let new_name = required("name", new_name)?;
    let new_email = required("email", new_email)?;
    if password.is_empty() {
        return Err(Error::validation("password", "must not be empty"));
    }

    conn.transaction(|conn| {
        if find_user(conn, new_name)?.is_some() {
            log::info!("username {new_name:?} already taken");
            return Err(Error::Conflict(format!("username {new_name:?} is already taken")));
        }

        let password_hash = bcrypt::hash(password, hash_cost)?;
        let user = diesel::insert_into(database::schema::users::table)
            .values(NewUserRow {
                name: new_name,
                email: new_email,
                password_hash: &password_hash,
            })
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(conflict_or(|| format!("username {new_name:?} is already taken")))?;
        log::info!("created user {} {:?}", user.id, user.name);
        Ok(user)
    })
}

/// Checks a name and password. Unknown users and wrong passwords fail the same way.
pub fn authenticate(conn: &mut database::Connection, name: &str, password: &str) -> Result<User> {
    let Some(user) = find_user(conn, name.trim())? else {
        log::debug!("login attempt for unknown user");
        return Err(Error::AuthFailure);
    };
    if !bcrypt::verify(password, &user.password_hash)? {
        log::debug!("wrong password for user {}", user.id);
        return Err(Error::AuthFailure);
    }
    Ok(user)
}

pub fn get_user(conn: &mut database::Connection, needle: UserId) -> Result<User> {
    use database::schema::users::dsl::*;

    users
        .select(User::as_select())
        .filter(id.eq(needle))
        .first(conn)
        .optional()?
        .ok_or_else(|| Error::not_found("user", needle))
}

pub fn find_user(conn: &mut database::Connection, needle: &str) -> Result<Option<User>> {
    use database::schema::users::dsl::*;

    Ok(users
        .select(User::as_select())
        .filter(name.eq(needle))
        .first(conn)
        .optional()?)
}

/// Profile fields to change. Absent or empty fields are left as they are.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub fn update_profile(
    conn: &mut database::Connection,
    edit_id: UserId,
    patch: &ProfilePatch,
    hash_cost: u32,
) -> Result<User> {
    let present = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };
    let mut changes = UserChanges {
        name: present(&patch.name),
        email: present(&patch.email),
        password_hash: None,
    };
    if let Some(password) = patch.password.as_deref().filter(|p| !p.is_empty()) {
        changes.password_hash = Some(bcrypt::hash(password, hash_cost)?);
    }

    conn.transaction(|conn| {
        let user = get_user(conn, edit_id)?;
        if changes == UserChanges::default() {
            return Ok(user);
        }

        use database::schema::users::dsl::*;

        let user = diesel::update(users.filter(id.eq(edit_id)))
            .set(&changes)
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(conflict_or(|| {
                format!("username {:?} is already taken", changes.name.as_deref().unwrap_or(""))
            }))?;
        log::info!("updated profile of user {edit_id}");
        Ok(user)
    })
}

/// The user's ledger entry for a recipe, if they ever rated or planned it.
pub fn ledger_entry(
    conn: &mut database::Connection,
    owner: UserId,
    recipe: RecipeId,
) -> Result<Option<UserRecipe>> {
    use database::schema::user_recipes::dsl::*;

    Ok(user_recipes
        .select(UserRecipe::as_select())
        .filter(user_id.eq(owner))
        .filter(recipe_id.eq(recipe))
        .first(conn)
        .optional()?)
}

/// Sets or clears the date a user plans to cook a recipe, creating an unrated ledger entry if
/// needed.
pub fn plan_recipe(
    conn: &mut database::Connection,
    owner: UserId,
    recipe: RecipeId,
    date: Option<chrono::NaiveDate>,
) -> Result<UserRecipe> {
    conn.transaction(|conn| {
        get_user(conn, owner)?;
        crate::recipes::get_recipe(conn, recipe)?;

        use database::schema::user_recipes::dsl::*;

        Ok(diesel::insert_into(user_recipes)
            .values((
                user_id.eq(owner),
                recipe_id.eq(recipe),
                planned_for.eq(date),
            ))
            .on_conflict((user_id, recipe_id))
            .do_update()
            .set(planned_for.eq(date))
            .returning(UserRecipe::as_returning())
            .get_result(conn)?)
    })
}

/// bcrypt's cheapest cost, so tests don't spend seconds hashing.
#[cfg(test)]
pub(crate) const TEST_HASH_COST: u32 = 4;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipes::{self, tests::new_recipe};

    const COST: u32 = TEST_HASH_COST;

    #[test]
    fn register_twice_conflicts() {
        let mut conn = database::establish_in_memory().unwrap();

        let alice = register(&mut conn, "alice", "alice@example.com", "s3cret", COST).unwrap();
        assert_ne!(alice.password_hash, "s3cret");
        assert!(bcrypt::verify("s3cret", &alice.password_hash).unwrap());

        let err = register(&mut conn, "alice", "other@example.com", "pw", COST).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{err}");

        let err = register(&mut conn, "bob", "", "pw", COST).unwrap_err();
        assert!(matches!(err, Error::Validation { field: "email", .. }), "{err}");
    }

    #[test]
    fn authentication_failures_look_alike() {
        let mut conn = database::establish_in_memory().unwrap();
        let alice = register(&mut conn, "alice", "alice@example.com", "s3cret", COST).unwrap();

        assert_eq!(authenticate(&mut conn, "alice", "s3cret").unwrap(), alice);

        let wrong_password = authenticate(&mut conn, "alice", "guess").unwrap_err();
        let unknown_user = authenticate(&mut conn, "mallory", "s3cret").unwrap_err();
        assert!(matches!(wrong_password, Error::AuthFailure));
        assert!(matches!(unknown_user, Error::AuthFailure));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[test]
    fn profile_patch_is_partial() {
        let mut conn = database::establish_in_memory().unwrap();
        let alice = register(&mut conn, "alice", "alice@example.com", "s3cret", COST).unwrap();
        register(&mut conn, "bob", "bob@example.com", "hunter2", COST).unwrap();

        let patch = ProfilePatch {
            email: Some("alice@example.org".into()),
            name: Some("".into()),
            ..Default::default()
        };
        let updated = update_profile(&mut conn, alice.id, &patch, COST).unwrap();
        assert_eq!(updated.name, "alice");
        assert_eq!(updated.email, "alice@example.org");
        assert_eq!(updated.password_hash, alice.password_hash);

        let patch = ProfilePatch {
            password: Some("n3w".into()),
            ..Default::default()
        };
        let updated = update_profile(&mut conn, alice.id, &patch, COST).unwrap();
        assert_ne!(updated.password_hash, alice.password_hash);
        authenticate(&mut conn, "alice", "n3w").unwrap();
        assert!(matches!(
            authenticate(&mut conn, "alice", "s3cret"),
            Err(Error::AuthFailure)
        ));

        let patch = ProfilePatch {
            name: Some("bob".into()),
            ..Default::default()
        };
        let err = update_profile(&mut conn, alice.id, &patch, COST).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)), "{err}");

        let err = update_profile(&mut conn, UserId(50), &ProfilePatch::default(), COST).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", .. }), "{err}");
    }

    #[test]
    fn planning_keeps_the_rating() {
        let mut conn = database::establish_in_memory().unwrap();
        let alice = register(&mut conn, "alice", "alice@example.com", "s3cret", COST).unwrap();
        let recipe = recipes::create(&mut conn, &new_recipe("Fish curry", None)).unwrap();
        let saturday = chrono::NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        let entry = plan_recipe(&mut conn, alice.id, recipe.id, Some(saturday)).unwrap();
        assert_eq!(entry.planned_for, Some(saturday));
        assert!(!entry.is_rated());

        recipes::record_rating(&mut conn, recipe.id, alice.id, 4, Default::default()).unwrap();
        let entry = plan_recipe(&mut conn, alice.id, recipe.id, None).unwrap();
        assert_eq!(entry.planned_for, None);
        assert_eq!(entry.rating, 4);

        // Planning created the entry, so the rating above counted as a first rating.
        let recipe = recipes::get_recipe(&mut conn, recipe.id).unwrap();
        assert_eq!(recipe.rating_count, 1);
    }
}

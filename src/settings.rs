// Copyright 2023 Remi Bernotavicius

//! Per-user key-value settings.
//!
//! Setting rows are shared: every distinct `(name, value)` pair is stored once and users link to
//! it through `user_settings`, whose `position` keeps the order values were given in.

use crate::database;
use crate::database::models::{Setting, SettingId, UserId, UserSetting};
use crate::{users, Error, Result};
use diesel::prelude::OptionalExtension as _;
use diesel::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// Read back as a scalar while one value is stored, as a list once there are more.
    Single,
    /// Any number of values, kept in order.
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingSpec {
    pub name: &'static str,
    pub kind: SettingKind,
    pub default: &'static [&'static str],
}

pub const SETTINGS: [SettingSpec; 6] = [
    SettingSpec {
        name: "allow_user_registration",
        kind: SettingKind::Single,
        default: &["true"],
    },
    SettingSpec {
        name: "default_category",
        kind: SettingKind::Multi,
        default: &["main"],
    },
    SettingSpec {
        name: "default_servings",
        kind: SettingKind::Single,
        default: &["2"],
    },
    SettingSpec {
        name: "default_duration",
        kind: SettingKind::Multi,
        default: &["0-15"],
    },
    SettingSpec {
        name: "default_language",
        kind: SettingKind::Single,
        default: &["en-us"],
    },
    SettingSpec {
        name: "grocery_day",
        kind: SettingKind::Single,
        default: &["sat"],
    },
];

/// The declared setting called `name`. Undeclared names are stored as multi-valued settings.
pub fn spec(name: &str) -> Option<&'static SettingSpec> {
    SETTINGS.iter().find(|s| s.name == name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Single(String),
    List(Vec<String>),
}

impl SettingValue {
    fn new(kind: SettingKind, mut values: Vec<String>) -> Self {
        match kind {
            SettingKind::Single if values.len() == 1 => Self::Single(values.remove(0)),
            _ => Self::List(values),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(v) => write!(f, "{v}"),
            Self::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

/// Drops empty values and exact duplicates. A value needs a name.
fn normalize<N, V>(entries: impl IntoIterator<Item = (N, V)>) -> Result<Vec<(String, String)>>
where
    N: AsRef<str>,
    V: AsRef<str>,
{
    let mut kept: Vec<(String, String)> = vec![];
    for (name, value) in entries {
        let (name, value) = (name.as_ref().trim(), value.as_ref().trim());
        if value.is_empty() || kept.iter().any(|(n, v)| n == name && v == value) {
            continue;
        }
        if name.is_empty() {
            return Err(Error::validation(
                "setting",
                format!("value {value:?} has no name"),
            ));
        }
        kept.push((name.into(), value.into()));
    }
    Ok(kept)
}

fn setting_row(conn: &mut database::Connection, key: &str, val: &str) -> Result<SettingId> {
    use database::schema::settings::dsl::*;

    let existing = settings
        .select(id)
        .filter(name.eq(key))
        .filter(value.eq(val))
        .first::<SettingId>(conn)
        .optional()?;
    if let Some(existing) = existing {
        return Ok(existing);
    }
    Ok(diesel::insert_into(settings)
        .values((name.eq(key), value.eq(val)))
        .returning(id)
        .get_result(conn)?)
}

/// Replaces every setting of `owner` with `entries`, in the given order.
pub fn replace_settings<N, V>(
    conn: &mut database::Connection,
    owner: UserId,
    entries: impl IntoIterator<Item = (N, V)>,
) -> Result<()>
where
    N: AsRef<str>,
    V: AsRef<str>,
{
    let entries = normalize(entries)?;

    conn.transaction(|conn| {
        users::get_user(conn, owner)?;

        use database::schema::user_settings::dsl::*;

        diesel::delete(user_settings.filter(user_id.eq(owner))).execute(conn)?;
        let mut links = Vec::with_capacity(entries.len());
        for ((key, val), p) in entries.iter().zip(0..) {
            links.push(UserSetting {
                user_id: owner,
                setting_id: setting_row(conn, key, val)?,
                position: p,
            });
        }
        if !links.is_empty() {
            diesel::insert_into(user_settings)
                .values(&links)
                .execute(conn)?;
        }
        log::info!("user {owner} now has {} setting value(s)", links.len());
        Ok(())
    })
}

/// The settings `owner` stored, in stored order.
pub fn stored_settings(conn: &mut database::Connection, owner: UserId) -> Result<Vec<Setting>> {
    use database::schema::{settings, user_settings};

    Ok(user_settings::table
        .inner_join(settings::table)
        .filter(user_settings::user_id.eq(owner))
        .order_by(user_settings::position)
        .select(Setting::as_select())
        .load(conn)?)
}

/// Every declared setting, taking stored values over defaults, plus any undeclared settings the
/// user stored.
pub fn effective_settings(
    conn: &mut database::Connection,
    owner: UserId,
) -> Result<BTreeMap<String, SettingValue>> {
    let stored = conn.transaction(|conn| {
        users::get_user(conn, owner)?;
        stored_settings(conn, owner)
    })?;

    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for setting in &stored {
        grouped
            .entry(setting.name.as_str())
            .or_default()
            .push(setting.value.clone());
    }

    let mut effective: BTreeMap<String, SettingValue> = SETTINGS
        .iter()
        .map(|spec| {
            let values = grouped
                .remove(spec.name)
                .unwrap_or_else(|| spec.default.iter().map(|v| v.to_string()).collect());
            (spec.name.to_owned(), SettingValue::new(spec.kind, values))
        })
        .collect();
    effective.extend(
        grouped
            .into_iter()
            .map(|(name, values)| (name.to_owned(), SettingValue::List(values))),
    );
    Ok(effective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    fn alice(conn: &mut database::Connection) -> UserId {
        users::register(conn, "alice", "alice@example.com", "s3cret", users::TEST_HASH_COST)
            .unwrap()
            .id
    }

    fn single(v: &str) -> SettingValue {
        SettingValue::Single(v.into())
    }

    fn list(values: &[&str]) -> SettingValue {
        SettingValue::List(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn defaults_fill_the_gaps() {
        let mut conn = database::establish_in_memory().unwrap();
        let alice = alice(&mut conn);

        assert_eq!(
            effective_settings(&mut conn, alice).unwrap(),
            btreemap! {
                "allow_user_registration".to_owned() => single("true"),
                "default_category".to_owned() => list(&["main"]),
                "default_servings".to_owned() => single("2"),
                "default_duration".to_owned() => list(&["0-15"]),
                "default_language".to_owned() => single("en-us"),
                "grocery_day".to_owned() => single("sat"),
            }
        );
    }

    #[test]
    fn shared_names_become_an_ordered_list() {
        let mut conn = database::establish_in_memory().unwrap();
        let alice = alice(&mut conn);

        replace_settings(
            &mut conn,
            alice,
            [
                ("default_category", "side dish"),
                ("grocery_day", "mon"),
                ("default_category", "desert"),
                ("default_servings", ""),
            ],
        )
        .unwrap();

        let effective = effective_settings(&mut conn, alice).unwrap();
        assert_eq!(effective["default_category"], list(&["side dish", "desert"]));
        assert_eq!(effective["grocery_day"], single("mon"));
        assert_eq!(effective["default_servings"], single("2"));
        assert_eq!(effective["default_category"].to_string(), "[side dish, desert]");
    }

    #[test]
    fn rows_are_shared_between_users() {
        let mut conn = database::establish_in_memory().unwrap();
        let alice = alice(&mut conn);
        let bob = users::register(&mut conn, "bob", "bob@example.com", "pw", users::TEST_HASH_COST)
            .unwrap()
            .id;

        replace_settings(&mut conn, alice, [("grocery_day", "fri")]).unwrap();
        replace_settings(&mut conn, bob, [("grocery_day", "fri")]).unwrap();

        let a = stored_settings(&mut conn, alice).unwrap();
        let b = stored_settings(&mut conn, bob).unwrap();
        assert_eq!(a, b);

        let rows: i64 = {
            use database::schema::settings::dsl::*;
            settings.count().get_result(&mut conn).unwrap()
        };
        assert_eq!(rows, 1);

        // Replacing is total: alice's old value is gone, bob's stays.
        replace_settings(&mut conn, alice, [("default_language", "nl")]).unwrap();
        assert_eq!(
            effective_settings(&mut conn, alice).unwrap()["grocery_day"],
            single("sat")
        );
        assert_eq!(
            effective_settings(&mut conn, bob).unwrap()["grocery_day"],
            single("fri")
        );
    }

    #[test]
    fn undeclared_names_are_kept_as_lists() {
        let mut conn = database::establish_in_memory().unwrap();
        let alice = alice(&mut conn);

        replace_settings(&mut conn, alice, [("theme", "dark"), ("grocery_day", "fri")]).unwrap();

        let effective = effective_settings(&mut conn, alice).unwrap();
        assert_eq!(effective["theme"], list(&["dark"]));
        assert_eq!(effective["grocery_day"], single("fri"));
        assert_eq!(effective.len(), SETTINGS.len() + 1);
    }

    #[test]
    fn repeated_single_values_become_a_list() {
        let mut conn = database::establish_in_memory().unwrap();
        let alice = alice(&mut conn);

        replace_settings(
            &mut conn,
            alice,
            [("grocery_day", "sat"), ("grocery_day", "sun")],
        )
        .unwrap();

        let effective = effective_settings(&mut conn, alice).unwrap();
        assert_eq!(effective["grocery_day"], list(&["sat", "sun"]));
    }

    #[test]
    fn rejected_entries_change_nothing() {
        let mut conn = database::establish_in_memory().unwrap();
        let alice = alice(&mut conn);
        replace_settings(&mut conn, alice, [("grocery_day", "fri")]).unwrap();

        let err = replace_settings(&mut conn, alice, [("grocery_day", "mon"), (" ", "blue")])
            .unwrap_err();
        assert!(matches!(err, Error::Validation { field: "setting", .. }), "{err}");
        assert_eq!(
            effective_settings(&mut conn, alice).unwrap()["grocery_day"],
            single("fri")
        );

        // The same value twice is not a second value.
        replace_settings(
            &mut conn,
            alice,
            [("grocery_day", "fri"), ("grocery_day", "fri")],
        )
        .unwrap();
        assert_eq!(stored_settings(&mut conn, alice).unwrap().len(), 1);

        let err = replace_settings(&mut conn, UserId(9), [("grocery_day", "fri")]).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", .. }), "{err}");
    }
}

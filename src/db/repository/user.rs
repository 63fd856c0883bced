use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::crypto::PasswordHash;
use crate::db::DatabaseError;
use crate::helpers;
use crate::models::enums::AppModule;
use crate::models::*;

const DEFAULT_ADMIN_PASSWORD: &str = "admin";

const USER_COLUMNS: &str = "id, username, full_name, email, is_active, created_at";

/// Create `admin`/`admin` with every module when the table is empty.
/// Returns whether the account was created.
pub fn ensure_default_user(conn: &Connection) -> Result<bool, DatabaseError> {
    let users: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    if users > 0 {
        return Ok(false);
    }
    create_user(
        conn,
        &NewUser {
            username: ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
            full_name: "Administrator".to_string(),
            email: String::new(),
            permissions: AppModule::ALL.to_vec(),
        },
    )?;
    tracing::info!("Created default administrator account");
    Ok(true)
}

/// Register an account and its module grants, returning the new id.
///
/// An active account with the same username blocks creation. An inactive
/// one is removed first so the name can be reused.
pub fn create_user(conn: &Connection, user: &NewUser) -> Result<i64, DatabaseError> {
    let username = user.username.trim();
    if username.is_empty() {
        return Err(DatabaseError::validation("User", "username is required"));
    }
    // Only the exact built-in name may be registered; case or spacing
    // variants would inherit its grants.
    if is_admin_username(username) && username != ADMIN_USERNAME {
        return Err(DatabaseError::ConstraintViolation(format!(
            "username '{username}' is reserved"
        )));
    }
    if user.password.is_empty() {
        return Err(DatabaseError::validation("User", "password is required"));
    }
    if !user.email.trim().is_empty() && !helpers::validate_email(&user.email) {
        return Err(DatabaseError::validation(
            "User",
            format!("email '{}' is not an email address", user.email),
        ));
    }

    let tx = conn.unchecked_transaction()?;
    let existing: Option<(i64, bool)> = tx
        .query_row(
            "SELECT id, is_active FROM users WHERE username = ?1",
            params![username],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    match existing {
        Some((_, true)) => {
            return Err(DatabaseError::ConstraintViolation(format!(
                "username '{username}' is already taken"
            )));
        }
        Some((old_id, false)) => {
            tracing::info!(username, old_id, "Replacing inactive account to reuse its username");
            tx.execute("DELETE FROM user_permissions WHERE user_id = ?1", params![old_id])?;
            tx.execute("DELETE FROM users WHERE id = ?1", params![old_id])?;
        }
        None => {}
    }

    let stored = PasswordHash::new(&user.password);
    tx.execute(
        "INSERT INTO users (username, password_hash, password_salt, full_name, email, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![username, stored.hash, stored.salt, user.full_name, user.email],
    )?;
    let id = tx.last_insert_rowid();
    write_permissions(&tx, id, &user.permissions)?;
    tx.commit()?;
    Ok(id)
}

/// The active account whose password matches, if any.
pub fn authenticate_user(conn: &Connection, username: &str, password: &str) -> Result<Option<User>, DatabaseError> {
    let row: Option<(i64, String, String)> = conn
        .query_row(
            "SELECT id, password_hash, password_salt FROM users
             WHERE username = ?1 AND is_active = 1",
            params![username.trim()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let Some((id, hash, salt)) = row else {
        return Ok(None);
    };
    let stored = PasswordHash { hash, salt };
    if !stored.verify(password) {
        return Ok(None);
    }
    get_user(conn, id)
}

pub fn get_user(conn: &Connection, user_id: i64) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    let user = conn.query_row(&sql, params![user_id], row_to_user).optional()?;
    user.map(|u| with_permissions(conn, u)).transpose()
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    let user = conn.query_row(&sql, params![username.trim()], row_to_user).optional()?;
    user.map(|u| with_permissions(conn, u)).transpose()
}

/// Active accounts, newest first, each with its grants.
pub fn get_all_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE is_active = 1 ORDER BY created_at DESC, id DESC");
    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map([], row_to_user)?
        .collect::<Result<Vec<_>, _>>()?;
    users.into_iter().map(|u| with_permissions(conn, u)).collect()
}

/// Apply the set fields of `update`. The administrator account is read-only.
pub fn update_user(conn: &Connection, user_id: i64, update: &UserUpdate) -> Result<(), DatabaseError> {
    refuse_admin(conn, user_id, "updated")?;
    let username = update.username.as_deref().map(str::trim);
    if let Some(name) = username {
        if name.is_empty() {
            return Err(DatabaseError::validation("User", "username is required"));
        }
        if is_admin_username(name) {
            return Err(DatabaseError::ConstraintViolation(format!(
                "username '{name}' is reserved"
            )));
        }
    }
    if let Some(email) = &update.email {
        if !email.trim().is_empty() && !helpers::validate_email(email) {
            return Err(DatabaseError::validation(
                "User",
                format!("email '{email}' is not an email address"),
            ));
        }
    }
    if matches!(&update.password, Some(p) if p.is_empty()) {
        return Err(DatabaseError::validation("User", "password is required"));
    }
    if update.is_empty() {
        return Err(DatabaseError::validation("User", "no fields to update"));
    }

    let stored = update.password.as_deref().map(PasswordHash::new);
    conn.execute(
        "UPDATE users SET
         username = COALESCE(?2, username),
         full_name = COALESCE(?3, full_name),
         email = COALESCE(?4, email),
         password_hash = COALESCE(?5, password_hash),
         password_salt = COALESCE(?6, password_salt),
         is_active = COALESCE(?7, is_active)
         WHERE id = ?1",
        params![
            user_id,
            username,
            update.full_name,
            update.email,
            stored.as_ref().map(|s| s.hash.as_str()),
            stored.as_ref().map(|s| s.salt.as_str()),
            update.is_active,
        ],
    )?;
    Ok(())
}

/// Soft delete: the account is deactivated, its row and grants remain.
pub fn delete_user(conn: &Connection, user_id: i64) -> Result<(), DatabaseError> {
    refuse_admin(conn, user_id, "deleted")?;
    conn.execute("UPDATE users SET is_active = 0 WHERE id = ?1", params![user_id])?;
    Ok(())
}

pub fn user_has_permission(conn: &Connection, user_id: i64, module: AppModule) -> Result<bool, DatabaseError> {
    Ok(get_user_permissions(conn, user_id)?.contains(&module))
}

/// Granted modules in declaration order. The administrator holds all of them.
pub fn get_user_permissions(conn: &Connection, user_id: i64) -> Result<Vec<AppModule>, DatabaseError> {
    let username = username_of(conn, user_id)?;
    if is_admin_username(&username) {
        return Ok(AppModule::ALL.to_vec());
    }
    stored_permissions(conn, user_id)
}

/// Replace the account's grants. The administrator's grants are fixed.
pub fn set_user_permissions(conn: &Connection, user_id: i64, modules: &[AppModule]) -> Result<(), DatabaseError> {
    refuse_admin(conn, user_id, "re-permissioned")?;
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM user_permissions WHERE user_id = ?1", params![user_id])?;
    write_permissions(&tx, user_id, modules)?;
    tx.commit()?;
    Ok(())
}

fn write_permissions(conn: &Connection, user_id: i64, modules: &[AppModule]) -> Result<(), DatabaseError> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO user_permissions (user_id, module_name) VALUES (?1, ?2)",
    )?;
    for module in modules {
        stmt.execute(params![user_id, module.as_str()])?;
    }
    Ok(())
}

fn stored_permissions(conn: &Connection, user_id: i64) -> Result<Vec<AppModule>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT module_name FROM user_permissions WHERE user_id = ?1")?;
    let names = stmt
        .query_map(params![user_id], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut granted = Vec::new();
    for name in names {
        match name.parse::<AppModule>() {
            Ok(module) => granted.push(module),
            Err(_) => tracing::warn!(user_id, module = %name, "Ignoring unknown permission module"),
        }
    }
    Ok(AppModule::ALL
        .iter()
        .copied()
        .filter(|m| granted.contains(m))
        .collect())
}

fn with_permissions(conn: &Connection, mut user: User) -> Result<User, DatabaseError> {
    user.permissions = if user.is_admin() {
        AppModule::ALL.to_vec()
    } else {
        stored_permissions(conn, user.id)?
    };
    Ok(user)
}

fn username_of(conn: &Connection, user_id: i64) -> Result<String, DatabaseError> {
    conn.query_row("SELECT username FROM users WHERE id = ?1", params![user_id], |row| row.get(0))
        .optional()?
        .ok_or_else(|| DatabaseError::not_found("User", &user_id.to_string()))
}

fn refuse_admin(conn: &Connection, user_id: i64, action: &str) -> Result<(), DatabaseError> {
    if is_admin_username(&username_of(conn, user_id)?) {
        return Err(DatabaseError::ConstraintViolation(format!(
            "the administrator account cannot be {action}"
        )));
    }
    Ok(())
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        email: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        permissions: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::*;

    fn clerk() -> NewUser {
        NewUser {
            username: "clerk".into(),
            password: "pass123".into(),
            full_name: "Front Desk".into(),
            email: "desk@clinic.org".into(),
            permissions: vec![AppModule::Billing, AppModule::Patient],
        }
    }

    #[test]
    fn default_admin_created_once() {
        let conn = test_db();
        assert!(ensure_default_user(&conn).unwrap());
        assert!(!ensure_default_user(&conn).unwrap());

        let admin = authenticate_user(&conn, "admin", "admin").unwrap().unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.permissions, AppModule::ALL);
    }

    #[test]
    fn authenticate_checks_password() {
        let conn = test_db();
        let id = create_user(&conn, &clerk()).unwrap();
        let user = authenticate_user(&conn, "clerk", "pass123").unwrap().unwrap();
        assert_eq!(user.id, id);
        assert!(authenticate_user(&conn, "clerk", "wrong").unwrap().is_none());
        assert!(authenticate_user(&conn, "nobody", "pass123").unwrap().is_none());
    }

    #[test]
    fn password_is_not_stored_in_clear() {
        let conn = test_db();
        create_user(&conn, &clerk()).unwrap();
        let stored: String = conn
            .query_row("SELECT password_hash FROM users WHERE username = 'clerk'", [], |r| r.get(0))
            .unwrap();
        assert_ne!(stored, "pass123");
    }

    #[test]
    fn permissions_are_returned_in_module_order() {
        let conn = test_db();
        let id = create_user(&conn, &clerk()).unwrap();
        assert_eq!(
            get_user_permissions(&conn, id).unwrap(),
            [AppModule::Patient, AppModule::Billing]
        );
        assert!(user_has_permission(&conn, id, AppModule::Billing).unwrap());
        assert!(!user_has_permission(&conn, id, AppModule::Report).unwrap());
    }

    #[test]
    fn active_duplicate_blocked_inactive_replaced() {
        let conn = test_db();
        let first = create_user(&conn, &clerk()).unwrap();
        assert!(matches!(
            create_user(&conn, &clerk()),
            Err(DatabaseError::ConstraintViolation(_))
        ));

        delete_user(&conn, first).unwrap();
        assert!(authenticate_user(&conn, "clerk", "pass123").unwrap().is_none());
        assert!(get_all_users(&conn).unwrap().is_empty());

        let mut again = clerk();
        again.password = "fresh".into();
        again.permissions = vec![AppModule::Report];
        let second = create_user(&conn, &again).unwrap();
        assert_ne!(first, second);
        assert!(get_user(&conn, first).unwrap().is_none());
        assert_eq!(get_user(&conn, second).unwrap().unwrap().permissions, [AppModule::Report]);
    }

    #[test]
    fn update_applies_only_set_fields() {
        let conn = test_db();
        let id = create_user(&conn, &clerk()).unwrap();
        update_user(
            &conn,
            id,
            &UserUpdate {
                full_name: Some("Billing Desk".into()),
                password: Some("newpass".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let user = get_user_by_username(&conn, "clerk").unwrap().unwrap();
        assert_eq!(user.full_name, "Billing Desk");
        assert_eq!(user.email, "desk@clinic.org");
        assert!(authenticate_user(&conn, "clerk", "newpass").unwrap().is_some());
        assert!(authenticate_user(&conn, "clerk", "pass123").unwrap().is_none());
    }

    #[test]
    fn administrator_is_immutable() {
        let conn = test_db();
        ensure_default_user(&conn).unwrap();
        let admin = get_user_by_username(&conn, "admin").unwrap().unwrap();

        let rename = UserUpdate {
            full_name: Some("Root".into()),
            ..Default::default()
        };
        assert!(update_user(&conn, admin.id, &rename).is_err());
        assert!(delete_user(&conn, admin.id).is_err());
        assert!(set_user_permissions(&conn, admin.id, &[]).is_err());
        assert_eq!(get_user_permissions(&conn, admin.id).unwrap(), AppModule::ALL);
        assert!(authenticate_user(&conn, "admin", "admin").unwrap().is_some());
    }

    #[test]
    fn cannot_rename_into_admin() {
        let conn = test_db();
        let mut limited = clerk();
        limited.permissions = vec![AppModule::Patient];
        let id = create_user(&conn, &limited).unwrap();

        for name in ["Admin", "Admin ", " ADMIN"] {
            let update = UserUpdate {
                username: Some(name.into()),
                ..Default::default()
            };
            assert!(
                matches!(update_user(&conn, id, &update), Err(DatabaseError::ConstraintViolation(_))),
                "rename to {name:?} must be refused"
            );
        }

        let user = get_user(&conn, id).unwrap().unwrap();
        assert_eq!(user.username, "clerk");
        assert_eq!(user.permissions, [AppModule::Patient]);
        assert!(!user_has_permission(&conn, id, AppModule::Billing).unwrap());
    }

    #[test]
    fn cannot_register_a_variant_of_admin() {
        let conn = test_db();
        ensure_default_user(&conn).unwrap();
        for name in ["ADMIN", "Admin", " admin "] {
            let mut user = clerk();
            user.username = name.into();
            assert!(
                matches!(create_user(&conn, &user), Err(DatabaseError::ConstraintViolation(_))),
                "registering {name:?} must be refused"
            );
        }
        assert_eq!(get_all_users(&conn).unwrap().len(), 1);
    }

    #[test]
    fn renamed_username_is_trimmed() {
        let conn = test_db();
        let id = create_user(&conn, &clerk()).unwrap();
        let update = UserUpdate {
            username: Some("  frontdesk ".into()),
            ..Default::default()
        };
        update_user(&conn, id, &update).unwrap();
        assert_eq!(get_user(&conn, id).unwrap().unwrap().username, "frontdesk");
    }

    #[test]
    fn empty_update_is_rejected() {
        let conn = test_db();
        let id = create_user(&conn, &clerk()).unwrap();
        assert!(matches!(
            update_user(&conn, id, &UserUpdate::default()),
            Err(DatabaseError::Validation { .. })
        ));
    }

    #[test]
    fn set_permissions_replaces_grants() {
        let conn = test_db();
        let id = create_user(&conn, &clerk()).unwrap();
        set_user_permissions(&conn, id, &[AppModule::Dashboard, AppModule::Report]).unwrap();
        assert_eq!(
            get_user_permissions(&conn, id).unwrap(),
            [AppModule::Dashboard, AppModule::Report]
        );
    }

    #[test]
    fn missing_user_is_not_found() {
        let conn = test_db();
        assert!(get_user(&conn, 42).unwrap().is_none());
        assert!(matches!(
            get_user_permissions(&conn, 42),
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(delete_user(&conn, 42), Err(DatabaseError::NotFound { .. })));
    }

    #[test]
    fn empty_password_rejected() {
        let conn = test_db();
        let mut user = clerk();
        user.password.clear();
        assert!(create_user(&conn, &user).is_err());
    }
}

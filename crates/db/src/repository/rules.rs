//! Automation rule CRUD.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{NewRule, RuleRow},
};

const RULE_COLUMNS: &str =
    "id, name, description, rule_type, conditions, platforms, is_active, priority, created_at";

/// All rules, highest priority first.
pub async fn list_rules(pool: &PgPool) -> Result<Vec<RuleRow>, DbError> {
    let sql = format!("SELECT {RULE_COLUMNS} FROM social_automation_rules ORDER BY priority DESC, name ASC");
    let rows = sqlx::query_as::<_, RuleRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Active rules only, highest priority first.
pub async fn list_active_rules(pool: &PgPool) -> Result<Vec<RuleRow>, DbError> {
    let sql = format!(
        "SELECT {RULE_COLUMNS} FROM social_automation_rules WHERE is_active = TRUE ORDER BY priority DESC"
    );
    let rows = sqlx::query_as::<_, RuleRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn rule_names(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let names: Vec<String> = sqlx::query_scalar("SELECT name FROM social_automation_rules")
        .fetch_all(pool)
        .await?;
    Ok(names)
}

pub async fn create_rule(pool: &PgPool, rule: &NewRule) -> Result<RuleRow, DbError> {
    let sql = format!(
        r#"
        INSERT INTO social_automation_rules
            (id, name, description, rule_type, conditions, platforms, is_active, priority, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {RULE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, RuleRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(&rule.rule_type)
        .bind(&rule.conditions)
        .bind(&rule.platforms)
        .bind(rule.is_active)
        .bind(rule.priority)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
        .map_err(DbError::from_write)
}

/// Replace every editable column of rule `id`.
pub async fn update_rule(pool: &PgPool, id: Uuid, rule: &NewRule) -> Result<RuleRow, DbError> {
    let sql = format!(
        r#"
        UPDATE social_automation_rules
        SET name = $2, description = $3, rule_type = $4, conditions = $5,
            platforms = $6, is_active = $7, priority = $8
        WHERE id = $1
        RETURNING {RULE_COLUMNS}
        "#
    );
    sqlx::query_as::<_, RuleRow>(&sql)
        .bind(id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(&rule.rule_type)
        .bind(&rule.conditions)
        .bind(&rule.platforms)
        .bind(rule.is_active)
        .bind(rule.priority)
        .fetch_optional(pool)
        .await
        .map_err(DbError::from_write)?
        .ok_or(DbError::NotFound)
}

/// Returns `DbError::NotFound` if no row was deleted.
pub async fn delete_rule(pool: &PgPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM social_automation_rules WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

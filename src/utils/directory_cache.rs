use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::model::employee::EmployeeRef;

/// Cached read-only view of the employee directory, keyed by
/// (employee_id, organization_uuid). Short TTL so deactivations and
/// transfers propagate without restarts.
pub static EMPLOYEE_CACHE: Lazy<Cache<(u64, String), EmployeeRef>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(600)) // 10 min TTL
        .build()
});

/// organization_uuid => accepts writes (exists and is active)
pub static ORGANIZATION_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(600))
        .build()
});

const EMPLOYEE_SELECT: &str = "SELECT e.id, e.organization_uuid, e.employee_code, \
     e.first_name, e.last_name, d.name AS department \
     FROM employees e \
     LEFT JOIN departments d ON d.id = e.department_id";

/// "Does employee X exist in organization Y and is X active" — the only
/// question this core asks the directory about a single employee.
pub async fn find_active_employee(
    pool: &MySqlPool,
    employee_id: u64,
    organization_uuid: &str,
) -> Result<Option<EmployeeRef>, sqlx::Error> {
    let cache_key = (employee_id, organization_uuid.to_string());
    if let Some(hit) = EMPLOYEE_CACHE.get(&cache_key).await {
        return Ok(Some(hit));
    }

    let sql = format!(
        "{EMPLOYEE_SELECT} WHERE e.id = ? AND e.organization_uuid = ? AND e.status = 'active'"
    );
    let employee = sqlx::query_as::<_, EmployeeRef>(&sql)
        .bind(employee_id)
        .bind(organization_uuid)
        .fetch_optional(pool)
        .await?;

    if let Some(emp) = &employee {
        EMPLOYEE_CACHE.insert(cache_key, emp.clone()).await;
    }
    Ok(employee)
}

/// "Does organization Y exist and accept writes."
pub async fn organization_accepts_writes(
    pool: &MySqlPool,
    organization_uuid: &str,
) -> Result<bool, sqlx::Error> {
    if let Some(hit) = ORGANIZATION_CACHE.get(organization_uuid).await {
        return Ok(hit);
    }

    let active: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM organizations WHERE organization_uuid = ? AND is_active = 1",
    )
    .bind(organization_uuid)
    .fetch_optional(pool)
    .await?;

    let accepts = active.is_some();
    if accepts {
        // only cache the positive answer; a missing org stays a DB miss
        ORGANIZATION_CACHE
            .insert(organization_uuid.to_string(), true)
            .await;
    }
    Ok(accepts)
}

/// All active employees of an organization, for the kiosk check-in list.
pub async fn active_employees(
    pool: &MySqlPool,
    organization_uuid: &str,
) -> Result<Vec<EmployeeRef>, sqlx::Error> {
    let sql = format!(
        "{EMPLOYEE_SELECT} WHERE e.organization_uuid = ? AND e.status = 'active' \
         ORDER BY e.first_name, e.last_name"
    );
    sqlx::query_as::<_, EmployeeRef>(&sql)
        .bind(organization_uuid)
        .fetch_all(pool)
        .await
}

/// Display fields for roster rows; cache-first, falling back to a lookup
/// that does not require the employee to still be active.
pub async fn employee_display(
    pool: &MySqlPool,
    employee_id: u64,
    organization_uuid: &str,
) -> Result<Option<EmployeeRef>, sqlx::Error> {
    let cache_key = (employee_id, organization_uuid.to_string());
    if let Some(hit) = EMPLOYEE_CACHE.get(&cache_key).await {
        return Ok(Some(hit));
    }

    let sql = format!("{EMPLOYEE_SELECT} WHERE e.id = ? AND e.organization_uuid = ?");
    sqlx::query_as::<_, EmployeeRef>(&sql)
        .bind(employee_id)
        .bind(organization_uuid)
        .fetch_optional(pool)
        .await
}

/// Load active employees into the in-memory cache at startup (batched).
pub async fn warmup_directory_cache(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let sql = format!("{EMPLOYEE_SELECT} WHERE e.status = 'active'");
    let mut stream = sqlx::query_as::<_, EmployeeRef>(&sql).fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let employee: EmployeeRef = row?;
        batch.push(employee);
        total_count += 1;

        if batch.len() >= batch_size {
            insert_batch(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch).await;
    }

    tracing::info!(total_count, "directory cache warmup complete");
    Ok(())
}

async fn insert_batch(employees: &[EmployeeRef]) {
    let futures: Vec<_> = employees
        .iter()
        .map(|e| EMPLOYEE_CACHE.insert((e.id, e.organization_uuid.clone()), e.clone()))
        .collect();
    futures::future::join_all(futures).await;
}

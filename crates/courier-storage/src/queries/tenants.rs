// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant and tenant-settings operations.
//!
//! Tenants are looked up three ways at the edge: by id, by inbound-mail route
//! secret, and by the SMS number the provider delivers to.

use courier_core::{CourierError, Tenant, TenantSettings};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

const TENANT_COLS: &str =
    "id, name, email_from_address, email_api_key, email_route_secret, sms_from_number, created_at";

fn row_to_tenant(row: &rusqlite::Row<'_>) -> Result<Tenant, rusqlite::Error> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        email_from_address: row.get(2)?,
        email_api_key: row.get(3)?,
        email_route_secret: row.get(4)?,
        sms_from_number: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Insert a new tenant.
pub async fn create_tenant(db: &Database, tenant: &Tenant) -> Result<(), CourierError> {
    let t = tenant.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenants (id, name, email_from_address, email_api_key,
                                      email_route_secret, sms_from_number)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    t.id,
                    t.name,
                    t.email_from_address,
                    t.email_api_key,
                    t.email_route_secret,
                    t.sms_from_number,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a tenant by id.
pub async fn get_tenant(db: &Database, id: &str) -> Result<Option<Tenant>, CourierError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {TENANT_COLS} FROM tenants WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_tenant) {
                Ok(t) => Ok(Some(t)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve the tenant owning an inbound-mail route secret.
pub async fn find_by_route_secret(
    db: &Database,
    secret: &str,
) -> Result<Option<Tenant>, CourierError> {
    let secret = secret.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TENANT_COLS} FROM tenants WHERE email_route_secret = ?1"
            ))?;
            match stmt.query_row(params![secret], row_to_tenant) {
                Ok(t) => Ok(Some(t)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve the tenant owning an inbound SMS destination number.
pub async fn find_by_sms_number(
    db: &Database,
    number: &str,
) -> Result<Option<Tenant>, CourierError> {
    let number = number.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TENANT_COLS} FROM tenants WHERE sms_from_number = ?1"
            ))?;
            match stmt.query_row(params![number], row_to_tenant) {
                Ok(t) => Ok(Some(t)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a tenant's policy settings row.
pub async fn upsert_settings(
    db: &Database,
    settings: &TenantSettings,
) -> Result<(), CourierError> {
    let s = settings.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenant_settings (tenant_id, timezone, quiet_hours_enabled,
                                              quiet_start, quiet_end, hourly_cap, daily_cap,
                                              dedupe_minutes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(tenant_id) DO UPDATE SET
                     timezone = excluded.timezone,
                     quiet_hours_enabled = excluded.quiet_hours_enabled,
                     quiet_start = excluded.quiet_start,
                     quiet_end = excluded.quiet_end,
                     hourly_cap = excluded.hourly_cap,
                     daily_cap = excluded.daily_cap,
                     dedupe_minutes = excluded.dedupe_minutes",
                params![
                    s.tenant_id,
                    s.timezone,
                    s.quiet_hours_enabled,
                    s.quiet_start,
                    s.quiet_end,
                    s.hourly_cap,
                    s.daily_cap,
                    s.dedupe_minutes,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a tenant's policy settings. `None` means no row exists and the
/// policy engine falls back to configured defaults entirely.
pub async fn get_settings(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<TenantSettings>, CourierError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tenant_id, timezone, quiet_hours_enabled, quiet_start, quiet_end,
                        hourly_cap, daily_cap, dedupe_minutes
                 FROM tenant_settings WHERE tenant_id = ?1",
            )?;
            match stmt.query_row(params![tenant_id], |row| {
                Ok(TenantSettings {
                    tenant_id: row.get(0)?,
                    timezone: row.get(1)?,
                    quiet_hours_enabled: row.get(2)?,
                    quiet_start: row.get(3)?,
                    quiet_end: row.get(4)?,
                    hourly_cap: row.get(5)?,
                    daily_cap: row.get(6)?,
                    dedupe_minutes: row.get(7)?,
                })
            }) {
                Ok(s) => Ok(Some(s)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{make_tenant, setup_db};

    #[tokio::test]
    async fn tenant_lookups_by_secret_and_number() {
        let (db, _dir) = setup_db().await;
        let tenant = make_tenant("t-1");
        create_tenant(&db, &tenant).await.unwrap();

        let by_secret = find_by_route_secret(&db, "route-secret-t-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_secret.id, "t-1");

        let by_number = find_by_sms_number(&db, "+15550100001").await.unwrap().unwrap();
        assert_eq!(by_number.id, "t-1");

        assert!(find_by_route_secret(&db, "nope").await.unwrap().is_none());
        assert!(find_by_sms_number(&db, "+10000000000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn settings_upsert_and_missing_row() {
        let (db, _dir) = setup_db().await;
        create_tenant(&db, &make_tenant("t-1")).await.unwrap();

        assert!(get_settings(&db, "t-1").await.unwrap().is_none());

        let settings = TenantSettings {
            tenant_id: "t-1".into(),
            timezone: Some("America/Chicago".into()),
            quiet_hours_enabled: true,
            quiet_start: Some("22:00".into()),
            quiet_end: Some("06:00".into()),
            hourly_cap: Some(3),
            daily_cap: None,
            dedupe_minutes: None,
        };
        upsert_settings(&db, &settings).await.unwrap();

        let loaded = get_settings(&db, "t-1").await.unwrap().unwrap();
        assert_eq!(loaded.timezone.as_deref(), Some("America/Chicago"));
        assert_eq!(loaded.hourly_cap, Some(3));
        assert_eq!(loaded.daily_cap, None);

        // Upsert replaces in place.
        let mut updated = settings.clone();
        updated.quiet_hours_enabled = false;
        upsert_settings(&db, &updated).await.unwrap();
        let loaded = get_settings(&db, "t-1").await.unwrap().unwrap();
        assert!(!loaded.quiet_hours_enabled);
    }
}

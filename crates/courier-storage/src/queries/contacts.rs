// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact operations.
//!
//! Uniqueness on (tenant, email) and (tenant, phone) is enforced by partial
//! unique indexes; `upsert_*` insert with ON CONFLICT DO NOTHING and
//! re-select, so two concurrent first-contact webhooks converge on one row.

use courier_core::{Contact, CourierError};
use rusqlite::params;
use uuid::Uuid;

use crate::database::{map_tr_err, Database};

const CONTACT_COLS: &str =
    "id, tenant_id, email, phone, display_name, status, metadata, created_at, updated_at";

fn row_to_contact(row: &rusqlite::Row<'_>) -> Result<Contact, rusqlite::Error> {
    Ok(Contact {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        display_name: row.get(4)?,
        status: row.get(5)?,
        metadata: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Fetch a contact by id, tenant-scoped.
pub async fn get_contact(
    db: &Database,
    tenant_id: &str,
    id: &str,
) -> Result<Option<Contact>, CourierError> {
    let tenant_id = tenant_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLS} FROM contacts WHERE tenant_id = ?1 AND id = ?2"
            ))?;
            match stmt.query_row(params![tenant_id, id], row_to_contact) {
                Ok(c) => Ok(Some(c)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find a contact by normalized email within a tenant.
pub async fn find_by_email(
    db: &Database,
    tenant_id: &str,
    email: &str,
) -> Result<Option<Contact>, CourierError> {
    let tenant_id = tenant_id.to_string();
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLS} FROM contacts WHERE tenant_id = ?1 AND email = ?2"
            ))?;
            match stmt.query_row(params![tenant_id, email], row_to_contact) {
                Ok(c) => Ok(Some(c)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Find a contact by normalized E.164 phone within a tenant.
pub async fn find_by_phone(
    db: &Database,
    tenant_id: &str,
    phone: &str,
) -> Result<Option<Contact>, CourierError> {
    let tenant_id = tenant_id.to_string();
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLS} FROM contacts WHERE tenant_id = ?1 AND phone = ?2"
            ))?;
            match stmt.query_row(params![tenant_id, phone], row_to_contact) {
                Ok(c) => Ok(Some(c)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get or create the contact for a normalized email. The insert races safely
/// against concurrent callers via the unique index: losers fall through to
/// the re-select.
pub async fn upsert_by_email(
    db: &Database,
    tenant_id: &str,
    email: &str,
    display_name: &str,
) -> Result<Contact, CourierError> {
    let tenant_id = tenant_id.to_string();
    let email = email.to_string();
    let display_name = display_name.to_string();
    let id = Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, tenant_id, email, display_name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(tenant_id, email) WHERE email IS NOT NULL DO NOTHING",
                params![id, tenant_id, email, display_name],
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLS} FROM contacts WHERE tenant_id = ?1 AND email = ?2"
            ))?;
            Ok(stmt.query_row(params![tenant_id, email], row_to_contact)?)
        })
        .await
        .map_err(map_tr_err)
}

/// Get or create the contact for a normalized E.164 phone.
pub async fn upsert_by_phone(
    db: &Database,
    tenant_id: &str,
    phone: &str,
    display_name: &str,
) -> Result<Contact, CourierError> {
    let tenant_id = tenant_id.to_string();
    let phone = phone.to_string();
    let display_name = display_name.to_string();
    let id = Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, tenant_id, phone, display_name)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(tenant_id, phone) WHERE phone IS NOT NULL DO NOTHING",
                params![id, tenant_id, phone, display_name],
            )?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLS} FROM contacts WHERE tenant_id = ?1 AND phone = ?2"
            ))?;
            Ok(stmt.query_row(params![tenant_id, phone], row_to_contact)?)
        })
        .await
        .map_err(map_tr_err)
}

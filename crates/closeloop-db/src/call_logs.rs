//! Call-log CRUD.
//!
//! Rows are written by the call initiator and then updated by the Twilio
//! status and recording webhooks as the call progresses.

use crate::StoreError;
use closeloop_types::{CallLog, NewCallLog};
use rusqlite::{params, Connection, OptionalExtension, Row};

fn map_row_to_call_log(row: &Row<'_>) -> rusqlite::Result<CallLog> {
    let duration: Option<i64> = row.get(6)?;
    Ok(CallLog {
        id: row.get(0)?,
        call_sid: row.get(1)?,
        campaign_id: row.get(2)?,
        lead_id: row.get(3)?,
        phone_number: row.get(4)?,
        status: row.get(5)?,
        duration_secs: duration.map(|d| d.max(0) as u32),
        recording_url: row.get(7)?,
        error_code: row.get(8)?,
        error_message: row.get(9)?,
        created_at: row.get(10)?,
    })
}

const CALL_LOG_COLUMNS: &str = "id, call_sid, campaign_id, lead_id, phone_number, status, \
     duration_secs, recording_url, error_code, error_message, created_at";

/// Inserts a call log at initiation time.
pub fn insert_call_log(conn: &Connection, params: &NewCallLog) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO call_logs (call_sid, campaign_id, lead_id, phone_number, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            params.call_sid,
            params.campaign_id,
            params.lead_id,
            params.phone_number,
            params.status,
        ],
    )?;
    Ok(())
}

/// Retrieves a call log by call SID.
pub fn get_call_log(conn: &Connection, call_sid: &str) -> Result<CallLog, StoreError> {
    conn.query_row(
        &format!("SELECT {CALL_LOG_COLUMNS} FROM call_logs WHERE call_sid = ?1"),
        [call_sid],
        map_row_to_call_log,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(call_sid.to_string()))
}

/// Lists call logs, newest first.
pub fn list_call_logs(conn: &Connection) -> Result<Vec<CallLog>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CALL_LOG_COLUMNS} FROM call_logs ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map([], map_row_to_call_log)?;
    let mut logs = Vec::new();
    for row in rows {
        logs.push(row?);
    }
    Ok(logs)
}

/// Records a status transition from the telephony status callback.
///
/// Unknown call SIDs are a no-op: status callbacks can outrace (or outlive)
/// the insert, and the webhook must never fail because of that.
pub fn update_call_status(
    conn: &Connection,
    call_sid: &str,
    status: &str,
    duration_secs: Option<u32>,
    error_code: Option<&str>,
    error_message: Option<&str>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE call_logs
         SET status = ?1,
             duration_secs = COALESCE(?2, duration_secs),
             error_code = COALESCE(?3, error_code),
             error_message = COALESCE(?4, error_message)
         WHERE call_sid = ?5",
        params![status, duration_secs, error_code, error_message, call_sid],
    )?;
    Ok(())
}

/// Attaches a completed recording to the call log. Unknown SIDs are a no-op.
pub fn set_call_recording(
    conn: &Connection,
    call_sid: &str,
    recording_url: &str,
    duration_secs: Option<u32>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE call_logs
         SET recording_url = ?1,
             duration_secs = COALESCE(?2, duration_secs)
         WHERE call_sid = ?3",
        params![recording_url, duration_secs, call_sid],
    )?;
    Ok(())
}

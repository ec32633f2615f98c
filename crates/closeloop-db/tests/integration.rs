//! Integration tests for pool creation, migrations, and CRUD round trips.

use closeloop_db::{create_pool, run_migrations, DbRuntimeSettings};
use closeloop_types::{CampaignStatus, LeadStatus, NewCallLog, NewCampaign, NewLead};

fn test_pool() -> closeloop_db::DbPool {
    // Pool size 1: every checkout reuses the one connection, so the
    // in-memory database is shared across calls.
    let settings = DbRuntimeSettings {
        pool_max_size: 1,
        ..Default::default()
    };
    let pool = create_pool(":memory:", settings).expect("failed to create in-memory pool");
    let conn = pool.get().unwrap();
    run_migrations(&conn).expect("migrations failed");
    drop(conn);
    pool
}

#[test]
fn migrations_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("closeloop.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
    let conn = pool.get().unwrap();

    let first = run_migrations(&conn).unwrap();
    assert!(first > 0);
    let second = run_migrations(&conn).unwrap();
    assert_eq!(second, 0);
}

#[test]
fn campaign_crud_round_trip() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    let campaign = closeloop_db::create_campaign(
        &conn,
        &NewCampaign {
            name: "Q3 Launch".to_string(),
            company: "Acme".to_string(),
            product_description: Some("Widgets".to_string()),
            target_audience: None,
        },
    )
    .unwrap();
    assert_eq!(campaign.status, CampaignStatus::Draft);

    closeloop_db::update_campaign_status(&conn, &campaign.id, CampaignStatus::Active).unwrap();
    let fetched = closeloop_db::get_campaign(&conn, &campaign.id).unwrap();
    assert_eq!(fetched.status, CampaignStatus::Active);
    assert_eq!(fetched.name, "Q3 Launch");

    let all = closeloop_db::list_campaigns(&conn).unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn unknown_campaign_is_not_found() {
    let pool = test_pool();
    let conn = pool.get().unwrap();
    let err = closeloop_db::get_campaign(&conn, "nope").unwrap_err();
    assert!(matches!(err, closeloop_db::StoreError::NotFound(_)));
}

#[test]
fn leads_filter_by_campaign_and_sort_by_score() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    let campaign = closeloop_db::create_campaign(
        &conn,
        &NewCampaign {
            name: "Outbound".to_string(),
            company: "Acme".to_string(),
            product_description: None,
            target_audience: None,
        },
    )
    .unwrap();

    for (name, score) in [("Ada", 40u8), ("Grace", 90), ("Alan", 70)] {
        closeloop_db::create_lead(
            &conn,
            &NewLead {
                campaign_id: campaign.id.clone(),
                name: name.to_string(),
                email: None,
                phone: Some("+15551234567".to_string()),
                company: None,
                title: None,
                score,
            },
        )
        .unwrap();
    }

    let leads = closeloop_db::list_leads(&conn, Some(&campaign.id)).unwrap();
    assert_eq!(leads.len(), 3);
    assert_eq!(leads[0].name, "Grace");
    assert_eq!(leads[0].status, LeadStatus::New);

    closeloop_db::update_lead_status(&conn, &leads[0].id, LeadStatus::Contacted).unwrap();
    let refetched = closeloop_db::get_lead(&conn, &leads[0].id).unwrap();
    assert_eq!(refetched.status, LeadStatus::Contacted);
}

#[test]
fn lead_score_update_persists_score_and_reason() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    let campaign = closeloop_db::create_campaign(
        &conn,
        &NewCampaign {
            name: "Scored".to_string(),
            company: "Acme".to_string(),
            product_description: None,
            target_audience: None,
        },
    )
    .unwrap();
    let lead = closeloop_db::create_lead(
        &conn,
        &NewLead {
            campaign_id: campaign.id.clone(),
            name: "Ada".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: None,
            company: None,
            title: Some("CTO".to_string()),
            score: 0,
        },
    )
    .unwrap();
    assert_eq!(lead.score_reason, None);

    closeloop_db::update_lead_score(&conn, &lead.id, 87, "Decision maker with direct fit").unwrap();
    let refetched = closeloop_db::get_lead(&conn, &lead.id).unwrap();
    assert_eq!(refetched.score, 87);
    assert_eq!(
        refetched.score_reason.as_deref(),
        Some("Decision maker with direct fit")
    );

    let err = closeloop_db::update_lead_score(&conn, "missing", 50, "n/a").unwrap_err();
    assert!(matches!(err, closeloop_db::StoreError::NotFound(_)));
}

#[test]
fn call_log_follows_status_and_recording_updates() {
    let pool = test_pool();
    let conn = pool.get().unwrap();

    closeloop_db::insert_call_log(
        &conn,
        &NewCallLog {
            call_sid: "CA123".to_string(),
            campaign_id: None,
            lead_id: None,
            phone_number: "+15551234567".to_string(),
            status: "initiated".to_string(),
        },
    )
    .unwrap();

    closeloop_db::update_call_status(&conn, "CA123", "ringing", None, None, None).unwrap();
    closeloop_db::update_call_status(&conn, "CA123", "completed", Some(95), None, None).unwrap();
    closeloop_db::set_call_recording(&conn, "CA123", "https://api.twilio.example/rec/RE1", None)
        .unwrap();

    let log = closeloop_db::get_call_log(&conn, "CA123").unwrap();
    assert_eq!(log.status, "completed");
    assert_eq!(log.duration_secs, Some(95));
    assert_eq!(
        log.recording_url.as_deref(),
        Some("https://api.twilio.example/rec/RE1")
    );

    // Status callbacks for calls we never logged must be a quiet no-op.
    closeloop_db::update_call_status(&conn, "CA999", "failed", None, Some("30003"), None).unwrap();
}

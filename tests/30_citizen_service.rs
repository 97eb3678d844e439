use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use serde_json::json;

use cidadao_api::citizen::{
    normalize, CitizenError, CitizenFilter, CitizenRecord, CreateCitizenRequest,
    UpdateCitizenRequest,
};
use cidadao_api::database::MemoryStore;
use cidadao_api::services::CitizenService;

fn service() -> (CitizenService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (CitizenService::new(store.clone()), store)
}

fn request(name: &str, national_id: &str, neighborhood: &str, address: &str) -> CreateCitizenRequest {
    CreateCitizenRequest {
        full_name: Some(name.into()),
        national_id: Some(national_id.into()),
        neighborhood: Some(neighborhood.into()),
        full_address: Some(address.into()),
        ..Default::default()
    }
}

fn update(body: serde_json::Value) -> UpdateCitizenRequest {
    serde_json::from_value(body).expect("valid update body")
}

fn legacy_row() -> CitizenRecord {
    CitizenRecord {
        id: 77,
        full_name: "  Joao da Silva ".into(),
        national_id: "77777777777".into(),
        spouse_name: Some("NULL".into()),
        spouse_national_id: Some("null".into()),
        neighborhood: "Centro".into(),
        zone: Some("   ".into()),
        phone: Some(" 11999990000 ".into()),
        email: Some("Null".into()),
        full_address: "Rua B, 20".into(),
        social_program: None,
        registration_status: "Active".into(),
        registration_date: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap_or_default(),
        active: true,
        voted: false,
        eligible: true,
    }
}

#[tokio::test]
async fn maria_gets_defaults_and_voting_touches_only_voted() -> Result<()> {
    let (citizens, _) = service();

    let created = citizens
        .create(request("Maria Souza", "11122233396", "Centro", "Rua A, 10"))
        .await?;
    assert!(created.active);
    assert!(!created.voted);
    assert!(created.eligible);
    assert_eq!(created.registration_status, "Active");

    let voted = citizens.set_voted(created.id, true).await?.expect("record exists");
    assert!(voted.voted);
    assert_eq!(voted, CitizenRecord { voted: true, ..created });
    Ok(())
}

#[tokio::test]
async fn duplicate_national_id_is_a_conflict() -> Result<()> {
    let (citizens, _) = service();

    citizens
        .create(request("Primeiro", "12345678901", "Centro", "Rua 1"))
        .await?;
    let err = citizens
        .create(request("Segundo", "123.456.789-01", "Centro", "Rua 2"))
        .await
        .unwrap_err();
    assert!(matches!(err, CitizenError::Conflict(ref id) if id == "12345678901"), "{:?}", err);
    Ok(())
}

#[tokio::test]
async fn update_national_id_conflicts_only_with_other_records() -> Result<()> {
    let (citizens, _) = service();

    let a = citizens.create(request("A", "10000000001", "Centro", "Rua 1")).await?;
    let b = citizens.create(request("B", "20000000002", "Centro", "Rua 2")).await?;

    let err = citizens
        .update(b.id, update(json!({ "national_id": "10000000001" })))
        .await
        .unwrap_err();
    assert!(matches!(err, CitizenError::Conflict(_)));

    let same = citizens
        .update(a.id, update(json!({ "national_id": "10000000001" })))
        .await?
        .expect("record exists");
    assert_eq!(same.national_id, "10000000001");
    Ok(())
}

#[tokio::test]
async fn empty_update_changes_nothing() -> Result<()> {
    let (citizens, _) = service();

    let created = citizens.create(request("C", "30000000003", "Centro", "Rua 3")).await?;
    let unchanged = citizens
        .update(created.id, update(json!({})))
        .await?
        .expect("record exists");
    assert_eq!(unchanged, created);

    assert!(citizens.update(9999, update(json!({}))).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn update_can_clear_optional_fields() -> Result<()> {
    let (citizens, _) = service();

    let mut req = request("D", "40000000004", "Centro", "Rua 4");
    req.zone = Some("Norte".into());
    req.email = Some("d@example.com".into());
    let created = citizens.create(req).await?;

    let updated = citizens
        .update(created.id, update(json!({ "zone": null })))
        .await?
        .expect("record exists");
    assert_eq!(updated.zone, None);
    assert_eq!(updated.email.as_deref(), Some("d@example.com"));
    Ok(())
}

#[tokio::test]
async fn logical_delete_keeps_the_record_out_of_active_listings() -> Result<()> {
    let (citizens, _) = service();

    let created = citizens.create(request("E", "50000000005", "Centro", "Rua 5")).await?;
    citizens.logical_delete(created.id).await?.expect("record exists");

    let fetched = citizens.get_by_id(created.id).await?.expect("still stored");
    assert!(!fetched.active);

    let active_only = CitizenFilter {
        active: Some(true),
        ..Default::default()
    };
    let listed = citizens.list(&active_only, 0, 100).await?;
    assert!(listed.iter().all(|r| r.id != created.id));
    assert_eq!(citizens.count(&active_only).await?, 0);
    Ok(())
}

#[tokio::test]
async fn search_matches_any_text_column_ignoring_case() -> Result<()> {
    let (citizens, _) = service();

    let by_name = citizens.create(request("Ana SILVA", "60000000001", "Centro", "Rua 1")).await?;
    let by_hood = citizens.create(request("Bia", "60000000002", "Vila silva", "Rua 2")).await?;
    let by_addr = citizens.create(request("Caio", "60000000003", "Centro", "Av. Silvana")).await?;
    citizens.create(request("Davi", "60000000004", "Centro", "Rua 4")).await?;

    let mut ids: Vec<i32> = citizens.search("Silva", 10).await?.iter().map(|r| r.id).collect();
    ids.sort();
    assert_eq!(ids, vec![by_name.id, by_hood.id, by_addr.id]);

    let by_cpf = citizens.search("600000000", 10).await?;
    assert_eq!(by_cpf.len(), 4);

    assert!(citizens.search("   ", 10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn reads_come_back_clean_and_normalizing_is_idempotent() -> Result<()> {
    let (citizens, store) = service();
    store.seed_citizen(legacy_row()).await;

    let record = citizens.get_by_id(77).await?.expect("seeded");
    assert_eq!(record.full_name, "Joao da Silva");
    assert_eq!(record.spouse_name, None);
    assert_eq!(record.spouse_national_id, None);
    assert_eq!(record.zone, None);
    assert_eq!(record.email, None);
    assert_eq!(record.phone.as_deref(), Some("11999990000"));

    assert_eq!(normalize(record.clone()), record);
    assert_eq!(normalize(normalize(legacy_row())), normalize(legacy_row()));
    Ok(())
}

#[tokio::test]
async fn lookup_by_cpf_accepts_formatting() -> Result<()> {
    let (citizens, _) = service();
    let created = citizens.create(request("F", "70000000007", "Centro", "Rua 7")).await?;

    let found = citizens.get_by_national_id("700.000.000-07").await?.expect("found");
    assert_eq!(found.id, created.id);

    assert!(citizens.get_by_national_id("80000000008").await?.is_none());
    assert!(matches!(
        citizens.get_by_national_id("12").await,
        Err(CitizenError::Validation(_))
    ));
    Ok(())
}

#[tokio::test]
async fn deactivated_records_still_own_their_cpf() -> Result<()> {
    let (citizens, _) = service();

    let gone = citizens.create(request("G", "90000000009", "Centro", "Rua 9")).await?;
    citizens.logical_delete(gone.id).await?.expect("record exists");

    let again = citizens
        .create(request("G2", "900.000.000-09", "Centro", "Rua 9"))
        .await;
    assert!(matches!(again, Err(CitizenError::Conflict(ref cpf)) if cpf == "90000000009"));

    let other = citizens.create(request("H", "91000000000", "Centro", "Rua 10")).await?;
    let moved = citizens
        .update(other.id, update(json!({ "national_id": "90000000009" })))
        .await;
    assert!(matches!(moved, Err(CitizenError::Conflict(_))));
    Ok(())
}

#[tokio::test]
async fn pages_walk_in_id_order_without_gaps() -> Result<()> {
    let (citizens, _) = service();

    let mut created = Vec::new();
    for i in 1..=7 {
        let record = citizens
            .create(request(&format!("P{}", i), &format!("4{:010}", i), "Centro", "Rua P"))
            .await?;
        created.push(record.id);
    }

    let all = CitizenFilter::default();
    let mut walked = Vec::new();
    let mut offset = 0;
    loop {
        let page = citizens.list(&all, offset, 3).await?;
        if page.is_empty() {
            break;
        }
        assert!(page.len() <= 3);
        walked.extend(page.iter().map(|r| r.id));
        offset += 3;
    }

    assert_eq!(walked, created);
    assert_eq!(citizens.list(&all, 6, 3).await?.len(), 1);
    assert!(citizens.list(&all, 7, 3).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn registration_status_filter_is_exact() -> Result<()> {
    let (citizens, _) = service();

    let active = citizens.create(request("S1", "52000000001", "Centro", "Rua S")).await?;
    let pending = citizens
        .create(CreateCitizenRequest {
            registration_status: Some("Pending".into()),
            ..request("S2", "52000000002", "Centro", "Rua S")
        })
        .await?;
    citizens
        .create(CreateCitizenRequest {
            registration_status: Some("Pending review".into()),
            ..request("S3", "52000000003", "Centro", "Rua S")
        })
        .await?;

    let by_status = |status: &str| CitizenFilter {
        registration_status: Some(status.into()),
        ..Default::default()
    };

    let ids: Vec<i32> = citizens
        .list(&by_status("Pending"), 0, 100)
        .await?
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![pending.id]);
    assert_eq!(citizens.count(&by_status("Pending")).await?, 1);

    let ids: Vec<i32> = citizens
        .list(&by_status("Active"), 0, 100)
        .await?
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![active.id]);

    assert!(citizens.list(&by_status("pending"), 0, 100).await?.is_empty());
    Ok(())
}

//! Account-wide commands against a mock api_json.html
//!
//! Two zones: example.com and example.net. Mocks are told apart by the `a`
//! and `z` form fields.

use ddns_core::config::Secret;
use ddns_core::http::HttpConfig;
use ddns_core::traits::UpdateResult;
use ddns_core::Error;
use ddns_provider_cloudflare::CloudflareAdmin;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn admin(server: &MockServer) -> CloudflareAdmin {
    CloudflareAdmin::new(
        "ops@example.com",
        Secret::new("8afbe6dea02407989af4dd4c97bb6e25"),
        Some(format!("{}/api_json.html", server.uri())),
        &HttpConfig::default(),
    )
    .unwrap()
}

fn success(act: &str, response: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "request": {"act": act},
        "response": response,
        "result": "success",
        "msg": null
    }))
}

async fn mount_zones(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api_json.html"))
        .and(body_string_contains("a=zone_load_multi"))
        .and(body_string_contains("tkn=8afbe6dea02407989af4dd4c97bb6e25"))
        .respond_with(success(
            "zone_load_multi",
            json!({"zones": {"has_more": false, "count": 2, "objs": [
                {"zone_id": "1", "zone_name": "example.com"},
                {"zone_id": "2", "zone_name": "example.net"}
            ]}}),
        ))
        .mount(server)
        .await;
}

async fn mount_records(server: &MockServer, zone: &str, objs: serde_json::Value) {
    Mock::given(method("POST"))
        .and(body_string_contains("a=rec_load_all"))
        .and(body_string_contains(format!("z={}", zone)))
        .respond_with(success(
            "rec_load_all",
            json!({"recs": {"has_more": false, "objs": objs}}),
        ))
        .mount(server)
        .await;
}

async fn mount_edit(server: &MockServer, rec_id: &str, content: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(body_string_contains("a=rec_edit"))
        .and(body_string_contains(format!("id={}&", rec_id)))
        .and(body_string_contains(format!("content={}", content)))
        .respond_with(success(
            "rec_edit",
            json!({"rec": {"obj": {"rec_id": rec_id}}}),
        ))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn rec(id: &str, display_name: &str, zone: &str, record_type: &str, content: &str) -> serde_json::Value {
    let name = if display_name == zone {
        zone.to_string()
    } else {
        format!("{}.{}", display_name, zone)
    };
    json!({
        "rec_id": id,
        "zone_name": zone,
        "display_name": display_name,
        "name": name,
        "type": record_type,
        "content": content,
        "ttl": "1",
        "service_mode": "0"
    })
}

#[tokio::test]
async fn list_walks_every_zone_and_filters_by_type() {
    let server = MockServer::start().await;
    mount_zones(&server).await;
    mount_records(
        &server,
        "example.com",
        json!([
            rec("101", "www", "example.com", "A", "203.0.113.7"),
            rec("102", "www", "example.com", "AAAA", "2001:db8::7"),
            rec("103", "cdn", "example.com", "CNAME", "www.example.com")
        ]),
    )
    .await;
    mount_records(
        &server,
        "example.net",
        json!([rec("201", "example.net", "example.net", "A", "198.51.100.9")]),
    )
    .await;

    let rows = admin(&server).list(Some("A")).await.unwrap();
    let listed: Vec<_> = rows
        .iter()
        .map(|r| (r.name.as_str(), r.content.as_str()))
        .collect();
    assert_eq!(
        listed,
        vec![("www.example.com", "203.0.113.7"), ("example.net", "198.51.100.9")]
    );

    assert_eq!(admin(&server).list(None).await.unwrap().len(), 4);
}

#[tokio::test]
async fn zone_that_fails_to_load_is_skipped() {
    let server = MockServer::start().await;
    mount_zones(&server).await;
    Mock::given(method("POST"))
        .and(body_string_contains("a=rec_load_all"))
        .and(body_string_contains("z=example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "error",
            "msg": "Invalid zone.",
            "err_code": "E_INVLDINPUT"
        })))
        .mount(&server)
        .await;
    mount_records(
        &server,
        "example.net",
        json!([rec("201", "home", "example.net", "A", "198.51.100.9")]),
    )
    .await;

    let rows = admin(&server).list(Some("A")).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].zone, "example.net");
    assert_eq!(rows[0].name, "home.example.net");
}

#[tokio::test]
async fn modify_rewrites_only_the_named_record() {
    let server = MockServer::start().await;
    mount_zones(&server).await;
    mount_records(
        &server,
        "example.com",
        json!([
            rec("101", "www", "example.com", "A", "203.0.113.7"),
            rec("102", "www", "example.com", "AAAA", "2001:db8::7")
        ]),
    )
    .await;
    mount_records(&server, "example.net", json!([])).await;
    Mock::given(method("POST"))
        .and(body_string_contains("a=rec_edit"))
        .and(body_string_contains("id=101&"))
        .and(body_string_contains("z=example.com"))
        .and(body_string_contains("type=A&"))
        .and(body_string_contains("name=www"))
        .and(body_string_contains("content=192.0.2.44"))
        .respond_with(success("rec_edit", json!({"rec": {"obj": {"rec_id": "101"}}})))
        .expect(1)
        .mount(&server)
        .await;

    let edit = admin(&server)
        .modify("www.example.com", Some("A"), "192.0.2.44")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(edit.zone, "example.com");
    assert_eq!(edit.from, "203.0.113.7");
    assert_eq!(edit.to, "192.0.2.44");
}

#[tokio::test]
async fn modify_of_unknown_name_edits_nothing() {
    let server = MockServer::start().await;
    mount_zones(&server).await;
    mount_records(
        &server,
        "example.com",
        json!([rec("101", "www", "example.com", "A", "203.0.113.7")]),
    )
    .await;
    mount_records(&server, "example.net", json!([])).await;
    Mock::given(method("POST"))
        .and(body_string_contains("a=rec_edit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let edit = admin(&server)
        .modify("mail.example.com", Some("A"), "192.0.2.44")
        .await
        .unwrap();

    assert!(edit.is_none());
}

#[tokio::test]
async fn change_moves_every_zone_off_the_old_address() {
    let server = MockServer::start().await;
    mount_zones(&server).await;
    mount_records(
        &server,
        "example.com",
        json!([
            rec("101", "www", "example.com", "A", "203.0.113.7"),
            rec("102", "api", "example.com", "A", "203.0.113.8"),
            rec("103", "txt", "example.com", "TXT", "203.0.113.7")
        ]),
    )
    .await;
    mount_records(
        &server,
        "example.net",
        json!([
            rec("201", "example.net", "example.net", "A", "203.0.113.7"),
            rec("202", "vpn", "example.net", "A", "203.0.113.7")
        ]),
    )
    .await;
    mount_edit(&server, "101", "192.0.2.44", 1).await;
    mount_edit(&server, "201", "192.0.2.44", 1).await;
    Mock::given(method("POST"))
        .and(body_string_contains("a=rec_edit"))
        .and(body_string_contains("id=202&"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "error",
            "msg": "Record is locked",
            "err_code": "E_INVLDREC"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = admin(&server)
        .change(Some("A"), "203.0.113.7", "192.0.2.44")
        .await
        .unwrap();

    let updated: Vec<_> = report.updated.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(updated, vec!["www.example.com", "example.net"]);

    assert_eq!(report.failed.len(), 1);
    let (edit, err) = &report.failed[0];
    assert_eq!(edit.name, "vpn.example.net");
    assert!(matches!(err, Error::Provider { .. }), "got {:?}", err);
}

#[tokio::test]
async fn cname_batch_edits_existing_and_creates_missing() {
    let server = MockServer::start().await;
    mount_records(
        &server,
        "example.com",
        json!([
            rec("301", "cn-1", "example.com", "CNAME", "cn-1.old.example.org"),
            rec("302", "cn-2", "example.com", "A", "203.0.113.7")
        ]),
    )
    .await;
    Mock::given(method("POST"))
        .and(body_string_contains("a=rec_edit"))
        .and(body_string_contains("id=301&"))
        .and(body_string_contains("type=CNAME"))
        .and(body_string_contains("service_mode=0"))
        .and(body_string_contains("content=cn-1.mirror.example.org"))
        .respond_with(success("rec_edit", json!({"rec": {"obj": {"rec_id": "301"}}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("a=rec_new"))
        .and(body_string_contains("type=CNAME"))
        .respond_with(success("rec_new", json!({"rec": {"obj": {"rec_id": "399"}}})))
        .expect(3)
        .mount(&server)
        .await;

    let outcomes = admin(&server)
        .cname_batch("example.com", "mirror.example.org", "cn,kr", 2)
        .await
        .unwrap();

    let published: Vec<_> = outcomes
        .into_iter()
        .map(|o| (o.name, o.target, o.result.unwrap()))
        .collect();
    assert_eq!(
        published,
        vec![
            (
                "cn-1".to_string(),
                "cn-1.mirror.example.org".to_string(),
                UpdateResult::Updated { record_id: "301".to_string() }
            ),
            (
                "cn-2".to_string(),
                "cn-2.mirror.example.org".to_string(),
                UpdateResult::Created { record_id: "399".to_string() }
            ),
            (
                "kr-1".to_string(),
                "kr-1.mirror.example.org".to_string(),
                UpdateResult::Created { record_id: "399".to_string() }
            ),
            (
                "kr-2".to_string(),
                "kr-2.mirror.example.org".to_string(),
                UpdateResult::Created { record_id: "399".to_string() }
            ),
        ]
    );
}

#[tokio::test]
async fn zone_listing_rejected_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("a=zone_load_multi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "error",
            "msg": "Invalid token",
            "err_code": "E_UNAUTH"
        })))
        .mount(&server)
        .await;

    let err = admin(&server).list(None).await.unwrap_err();

    assert!(matches!(err, Error::Authentication(_)), "got {:?}", err);
}

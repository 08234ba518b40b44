//! End-to-end tests for the archive REST resources
//!
//! Covers reads, filters, pagination, relationship endpoints and writes.

mod common;

use common::*;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .expect("Expected an array")
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_list_poets_is_paginated_and_sorted_by_name() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_poets("").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 2);
    assert!(body["next"].is_null());
    assert!(body["previous"].is_null());
    assert_eq!(ids(&body["results"]), vec![POET_1_ID, POET_2_ID]);
    assert_eq!(body["results"][0]["poems_count"], 2);
}

#[tokio::test]
async fn test_list_poets_filters_and_orders() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.list_poets("century=modern").await.json().await.unwrap();
    assert_eq!(ids(&body["results"]), vec![POET_2_ID]);

    let body: Value = client.list_poets("search=haf").await.json().await.unwrap();
    assert_eq!(ids(&body["results"]), vec![POET_1_ID]);

    let body: Value = client.list_poets("ordering=-name").await.json().await.unwrap();
    assert_eq!(ids(&body["results"]), vec![POET_2_ID, POET_1_ID]);

    let body: Value = client
        .list_poets("ordering=not_a_field")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&body["results"]), vec![POET_1_ID, POET_2_ID]);
}

#[tokio::test]
async fn test_unknown_century_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.list_poets("century=future").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert!(body["errors"]["century"].is_array());
}

#[tokio::test]
async fn test_pagination_links_and_limits() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.get("/api/poems").await.json().await.unwrap();
    assert_eq!(body["count"], 3);
    assert_eq!(body["next"], 2);
    assert!(body["previous"].is_null());
    assert_eq!(body["results"].as_array().unwrap().len(), TEST_PAGE_SIZE);

    let body: Value = client.get("/api/poems?page=2").await.json().await.unwrap();
    assert!(body["next"].is_null());
    assert_eq!(body["previous"], 1);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let body: Value = client.get("/api/poems?page=last").await.json().await.unwrap();
    assert_eq!(body["previous"], 1);

    let body: Value = client
        .get("/api/verses?page_size=1000")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["results"].as_array().unwrap().len(), TEST_MAX_PAGE_SIZE);

    let response = client.get("/api/poems?page=3").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message_en"], "Invalid page.");
}

#[tokio::test]
async fn test_get_poet_detail() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_poet(POET_1_ID).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], POET_1_NAME);
    assert_eq!(body["century"], "classical");
    assert_eq!(body["century_display"], "کلاسیک");
    assert_eq!(body["categories_count"], 2);
    assert_eq!(body["poems_count"], 2);
}

#[tokio::test]
async fn test_missing_poet_is_not_found() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.get_poet(MISSING_ID).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
    assert_eq!(
        body["message_en"],
        format!("Poet with ID {} not found.", MISSING_ID)
    );
}

#[tokio::test]
async fn test_poet_relationships() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let categories: Value = client
        .get(&format!("/api/poets/{}/categories", POET_1_ID))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&categories), vec![CATEGORY_DIVAN_ID]);

    let poems: Value = client
        .get(&format!("/api/poets/{}/poems", POET_1_ID))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(poems["count"], 2);
    assert_eq!(ids(&poems["results"]), vec![POEM_1_ID, POEM_2_ID]);
}

#[tokio::test]
async fn test_category_detail_has_children_and_breadcrumbs() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client
        .get_category(CATEGORY_GHAZALS_ID)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["title"], CATEGORY_GHAZALS_TITLE);
    assert_eq!(body["parent"], CATEGORY_DIVAN_ID);
    assert_eq!(body["parent_title"], CATEGORY_DIVAN_TITLE);
    assert_eq!(body["poet_name"], POET_1_NAME);
    assert_eq!(body["poems_count"], 2);
    assert_eq!(
        body["breadcrumbs"],
        json!([
            {"id": CATEGORY_DIVAN_ID, "title": CATEGORY_DIVAN_TITLE},
            {"id": CATEGORY_GHAZALS_ID, "title": CATEGORY_GHAZALS_TITLE},
        ])
    );

    let subcategories: Value = client
        .get(&format!("/api/categories/{}/subcategories", CATEGORY_DIVAN_ID))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&subcategories), vec![CATEGORY_GHAZALS_ID]);
}

#[tokio::test]
async fn test_categories_parent_filter() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client
        .get("/api/categories?parent=null&page_size=5")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(
        ids(&body["results"]),
        vec![CATEGORY_COLLECTION_ID, CATEGORY_DIVAN_ID]
    );

    let body: Value = client
        .get(&format!("/api/categories?parent={}", CATEGORY_DIVAN_ID))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&body["results"]), vec![CATEGORY_GHAZALS_ID]);

    let response = client.get("/api/categories?parent=abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_poem_detail_has_ordered_verses_and_uploaded_audio() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.get_poem(POEM_1_ID).await.json().await.unwrap();
    assert_eq!(body["title"], POEM_1_TITLE);
    assert_eq!(body["poet_id"], POET_1_ID);
    assert_eq!(body["poet_name"], POET_1_NAME);
    assert_eq!(body["category_title"], CATEGORY_GHAZALS_TITLE);
    assert_eq!(body["verses_count"], 4);
    assert_eq!(
        ids(&body["verses"]),
        vec![VERSE_1_ID, VERSE_2_ID, 1002, 1003]
    );
    assert_eq!(body["verses"][1]["position"], 1);
    assert_eq!(body["audios"].as_array().unwrap().len(), 1);
    assert_eq!(body["audios"][0]["is_uploaded"], true);

    let verses: Value = client
        .get(&format!("/api/poems/{}/verses", POEM_3_ID))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&verses), vec![VERSE_POEM_3_ID]);
    assert_eq!(verses[0]["position_display"], "Single (نیمایی/آزاد)");
}

#[tokio::test]
async fn test_verse_position_filter() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client
        .get("/api/verses?position=4")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(ids(&body["results"]), vec![VERSE_POEM_3_ID]);

    let response = client.get("/api/verses?position=42").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_update_and_delete_poet() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .create_poet(&json!({"name": "  Rumi  ", "century": "classical"}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let id = body["id"].as_i64().unwrap();
    assert_eq!(body["name"], "Rumi");
    assert_eq!(body["poems_count"], 0);

    let response = client
        .patch_json(&format!("/api/poets/{}", id), &json!({"century": "ancient"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Rumi");
    assert_eq!(body["century"], "ancient");

    let response = client
        .put_json(&format!("/api/poets/{}", id), &json!({"name": "Molana"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Molana");
    assert_eq!(body["century"], "classical");

    let response = client.delete(&format!("/api/poets/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client.get_poet(id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_poet_name_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.create_poet(&json!({"name": "   "})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert!(body["errors"]["name"].is_array());
}

#[tokio::test]
async fn test_deleting_poet_cascades_to_its_poems() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client.delete(&format!("/api/poets/{}", POET_2_ID)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client.get_poem(POEM_3_ID).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = client.get_category(CATEGORY_COLLECTION_ID).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_with_missing_poet_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .post_json(
            "/api/categories",
            &json!({"poet": MISSING_ID, "title": "Orphan"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["errors"]["poet"].is_array());
}

#[tokio::test]
async fn test_duplicate_verse_slot_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .post_json(
            "/api/verses",
            &json!({"poem": POEM_1_ID, "order": 1, "position": 0, "text": "تکراری"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post_json(
            "/api/verses",
            &json!({"poem": POEM_1_ID, "order": 3, "position": 0, "text": "تازه"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["position_display"], "Right (مصرع اول)");
}

#[tokio::test]
async fn test_created_audio_is_never_marked_uploaded() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let response = client
        .post_json(
            "/api/audios",
            &json!({
                "poem": POEM_2_ID,
                "download_url": "https://example.com/ghazal-2.mp3",
                "is_uploaded": true,
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["is_uploaded"], false);
    assert_eq!(body["poem_title"], POEM_2_TITLE);

    let poem: Value = client.get_poem(POEM_2_ID).await.json().await.unwrap();
    assert!(poem["audios"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_audio_sync_reports_verse_text() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let audios: Value = client
        .get(&format!("/api/audios?poem={}", POEM_1_ID))
        .await
        .json()
        .await
        .unwrap();
    let audio_id = audios["results"][0]["id"].as_i64().unwrap();

    let response = client
        .post_json(
            "/api/audio-syncs",
            &json!({"poem": POEM_1_ID, "audio": audio_id, "verse_order": 1, "millisec": 1500}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["poem_title"], POEM_1_TITLE);
    assert_eq!(body["verse_text"], "الا یا ایها الساقی ادر کاسا و ناولها");

    let response = client
        .post_json(
            "/api/audio-syncs",
            &json!({"poem": POEM_1_ID, "audio": audio_id, "verse_order": 9, "millisec": 1}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(
        body["errors"]["non_field_errors"][0],
        "A verse with this order does not exist in this poem."
    );
}

#[tokio::test]
async fn test_audio_sync_verse_text_is_null_once_its_verses_are_gone() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated(server.base_url.clone()).await;

    let audios: Value = client
        .get(&format!("/api/audios?poem={}", POEM_1_ID))
        .await
        .json()
        .await
        .unwrap();
    let audio_id = audios["results"][0]["id"].as_i64().unwrap();

    let response = client
        .post_json(
            "/api/audio-syncs",
            &json!({"poem": POEM_1_ID, "audio": audio_id, "verse_order": 2, "millisec": 4000}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let sync_id = body["id"].as_i64().unwrap();
    assert!(body["verse_text"].is_string());

    // Both hemistichs of the second couplet.
    for verse_id in [1002, 1003] {
        let response = client.delete(&format!("/api/verses/{}", verse_id)).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = client.get(&format!("/api/audio-syncs/{}", sync_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["verse_order"], 2);
    assert!(body["verse_text"].is_null());
}

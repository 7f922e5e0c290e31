use bson::{Bson, Uuid, doc};

use docfind_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::StoreError,
    query::{Filter, Patch, Query, SortDirection},
};
use docfind_memory::InMemoryStore;

fn course(name: &str, price: i32, published: bool) -> (Uuid, Bson) {
    let id = Uuid::new();
    let doc = Bson::Document(doc! {
        "id": id,
        "name": name,
        "price": price,
        "is_published": published,
    });
    (id, doc)
}

async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::builder().build().await.unwrap();
    let docs = vec![
        course("Node Course", 20, true),
        course("React Course", 15, true),
        course("SQL Course", 10, false),
    ];
    store.insert_documents(docs, "courses").await.unwrap();
    store
}

#[tokio::test]
async fn insert_then_get_roundtrip() {
    let store = InMemoryStore::new();
    let (id, doc) = course("Node Course", 20, true);

    store
        .insert_documents(vec![(id, doc.clone())], "courses")
        .await
        .unwrap();

    let fetched = store.get_documents(vec![id], "courses").await.unwrap();
    assert_eq!(fetched, vec![doc]);
}

#[tokio::test]
async fn duplicate_insert_is_rejected() {
    let store = InMemoryStore::new();
    let (id, doc) = course("Node Course", 20, true);

    store
        .insert_documents(vec![(id, doc.clone())], "courses")
        .await
        .unwrap();
    let err = store
        .insert_documents(vec![(id, doc)], "courses")
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::DocumentAlreadyExists(_, _)));
}

#[tokio::test]
async fn replacing_a_missing_document_is_an_error() {
    let store = seeded_store().await;
    let (id, doc) = course("Ghost Course", 1, false);

    let err = store
        .update_documents(vec![(id, doc)], "courses")
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::DocumentNotFound(_, _)));
}

#[tokio::test]
async fn unknown_collection_queries_are_empty() {
    let store = InMemoryStore::new();

    let results = store
        .query_documents(Query::new(), "nothing")
        .await
        .unwrap();
    assert!(results.is_empty());

    let count = store.count_documents(None, "nothing").await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn query_applies_filter_sort_and_limit_in_order() {
    let store = seeded_store().await;

    let query = Query::builder()
        .filter(Filter::eq("is_published", true))
        .sort("price", SortDirection::Desc)
        .limit(1)
        .build()
        .unwrap();

    let results = store.query_documents(query, "courses").await.unwrap();

    // The limit applies after sorting, so the single survivor is the most
    // expensive published course, not an arbitrary one.
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].as_document().unwrap().get("name"),
        Some(&Bson::String("Node Course".to_string()))
    );
}

#[tokio::test]
async fn projection_keeps_only_named_fields_and_id() {
    let store = seeded_store().await;

    let query = Query::builder()
        .select(["name"])
        .build()
        .unwrap();

    let results = store.query_documents(query, "courses").await.unwrap();
    assert_eq!(results.len(), 3);

    for result in results {
        let doc = result.as_document().unwrap();
        let mut keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["id", "name"]);
    }
}

#[tokio::test]
async fn count_ignores_sort_projection_and_limit() {
    let store = seeded_store().await;

    let count = store
        .count_documents(Some(Filter::eq("is_published", true)), "courses")
        .await
        .unwrap();

    assert_eq!(count, 2);
}

#[tokio::test]
async fn update_one_patches_the_first_match() {
    let store = seeded_store().await;

    let updated = store
        .update_one(
            Some(Filter::eq("name", "SQL Course")),
            Patch::new().set("is_published", true),
            true,
            "courses",
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        updated.as_document().unwrap().get("is_published"),
        Some(&Bson::Boolean(true))
    );

    let count = store
        .count_documents(Some(Filter::eq("is_published", true)), "courses")
        .await
        .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn update_one_without_a_match_is_absent() {
    let store = seeded_store().await;

    let result = store
        .update_one(
            Some(Filter::eq("name", "No Such Course")),
            Patch::new().set("price", 0),
            true,
            "courses",
        )
        .await
        .unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn update_one_can_return_the_pre_update_image() {
    let store = seeded_store().await;

    let before = store
        .update_one(
            Some(Filter::eq("name", "React Course")),
            Patch::new().set("price", 25),
            false,
            "courses",
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        before.as_document().unwrap().get("price"),
        Some(&Bson::Int32(15))
    );
}

#[tokio::test]
async fn patching_the_id_field_is_rejected() {
    let store = seeded_store().await;

    let err = store
        .update_one(
            None,
            Patch::new().set("id", Uuid::new()),
            true,
            "courses",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidArgument(_)));
}

#[tokio::test]
async fn delete_one_removes_and_returns_the_document() {
    let store = seeded_store().await;

    let deleted = store
        .delete_one(Some(Filter::eq("name", "SQL Course")), "courses")
        .await
        .unwrap();
    assert!(deleted.is_some());

    let remaining = store.count_documents(None, "courses").await.unwrap();
    assert_eq!(remaining, 2);

    let again = store
        .delete_one(Some(Filter::eq("name", "SQL Course")), "courses")
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn id_targeted_update_and_delete_miss_silently() {
    let store = seeded_store().await;
    let unknown = Uuid::new();

    let updated = store
        .update_by_id(unknown, Patch::new().set("price", 1), true, "courses")
        .await
        .unwrap();
    assert!(updated.is_none());

    let deleted = store.delete_by_id(unknown, "courses").await.unwrap();
    assert!(deleted.is_none());
}

#[tokio::test]
async fn update_by_id_selects_the_image() {
    let store = InMemoryStore::new();
    let (id, doc) = course("Node Course", 20, true);
    store.insert_documents(vec![(id, doc)], "courses").await.unwrap();

    let new_image = store
        .update_by_id(id, Patch::new().set("price", 30), true, "courses")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        new_image.as_document().unwrap().get("price"),
        Some(&Bson::Int32(30))
    );

    let old_image = store
        .update_by_id(id, Patch::new().set("price", 40), false, "courses")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        old_image.as_document().unwrap().get("price"),
        Some(&Bson::Int32(30))
    );
}

#[tokio::test]
async fn unset_removes_a_field() {
    let store = InMemoryStore::new();
    let (id, doc) = course("Node Course", 20, true);
    store.insert_documents(vec![(id, doc)], "courses").await.unwrap();

    let updated = store
        .update_by_id(id, Patch::new().unset("price"), true, "courses")
        .await
        .unwrap()
        .unwrap();

    assert!(updated.as_document().unwrap().get("price").is_none());
}

#[tokio::test]
async fn collection_admin_roundtrip() {
    let store = InMemoryStore::new();

    store.create_collection("courses").await.unwrap();
    store.create_collection("authors").await.unwrap();

    let mut names = store.list_collections().await.unwrap();
    names.sort_unstable();
    assert_eq!(names, vec!["authors", "courses"]);

    store.drop_collection("authors").await.unwrap();
    assert_eq!(store.list_collections().await.unwrap(), vec!["courses"]);

    let err = store.drop_collection("authors").await.unwrap_err();
    assert!(matches!(err, StoreError::CollectionNotFound(_)));
}

#[tokio::test]
async fn clones_share_the_same_data() {
    let store = InMemoryStore::new();
    let clone = store.clone();

    let (id, doc) = course("Node Course", 20, true);
    store.insert_documents(vec![(id, doc)], "courses").await.unwrap();

    let fetched = clone.get_documents(vec![id], "courses").await.unwrap();
    assert_eq!(fetched.len(), 1);
}

//! Retrieval behaviour over an in-memory store with deterministic fakes

mod common;

use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use climaterag::config::RetrievalSettings;
use climaterag::embedding::EmbeddingProvider;
use climaterag::errors::RagError;
use climaterag::rag::{ContextAssembler, Retriever};
use climaterag::types::Payload;
use climaterag::vector_db::{Collection, VectorStore};

use common::*;

fn assembler(embedder: Arc<dyn EmbeddingProvider>) -> ContextAssembler {
    ContextAssembler::new(embedder, RetrievalSettings::default())
}

async fn knowledge_corpus(embedder: Arc<dyn EmbeddingProvider>) -> Collection {
    collection_with(
        "knowledge",
        embedder,
        vec![
            point("a", [1.0, 0.0, 0.0], knowledge_payload("A")),
            point("a2", [0.99, 0.01, 0.0], knowledge_payload("A2")),
            point("b", [0.0, 1.0, 0.0], knowledge_payload("B")),
            point("c", [0.0, 0.0, 1.0], knowledge_payload("C")),
        ],
    )
    .await
}

fn corpus_embedder() -> Arc<TableEmbedder> {
    Arc::new(TableEmbedder::new(&[
        ("A", [1.0, 0.0, 0.0]),
        ("A2", [0.99, 0.01, 0.0]),
        ("B", [0.0, 1.0, 0.0]),
        ("C", [0.0, 0.0, 1.0]),
    ]))
}

#[tokio::test]
async fn test_country_policies_filtered_by_country_and_year() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TableEmbedder::default());
    let policies = collection_with(
        "policies",
        embedder.clone(),
        vec![
            point("fr2010", [1.0, 0.0, 0.0], policy_payload("France", "2010", "Old French policy")),
            point("fr2020", [0.9, 0.1, 0.0], policy_payload("France", "2020", "New French policy")),
            point("de2020", [1.0, 0.0, 0.0], policy_payload("Germany", "2020", "German policy")),
        ],
    )
    .await;

    let context = assembler(embedder)
        .retrieve_country_policies("France", "emissions", &policies, 2015, 50)
        .await
        .unwrap();

    assert_eq!(context.contents, vec!["New French policy"]);
    assert_eq!(context.text(), "New French policy");
}

#[tokio::test]
async fn test_threshold_at_upper_bound_skips_store() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TableEmbedder::default());
    let store = Arc::new(UnreachableStore::default());
    let policies = Collection::new("policies", store.clone() as Arc<dyn VectorStore>);
    let assembler = assembler(embedder);

    for threshold in [2100, 2150] {
        let context = assembler
            .retrieve_country_policies("France", "q", &policies, threshold, 50)
            .await
            .unwrap();
        assert!(context.is_empty());
        assert_eq!(context.text(), "");
    }
    assert_eq!(store.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_failure_propagates() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TableEmbedder::default());
    let store: Arc<dyn VectorStore> = Arc::new(UnreachableStore::default());
    let knowledge = Collection::new("knowledge", store);

    let result = assembler(embedder).retrieve_knowledge("q", &knowledge, 10).await;
    assert!(matches!(result, Err(RagError::RemoteService { .. })));
}

#[tokio::test]
async fn test_empty_corpus_gives_empty_context() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TableEmbedder::default());
    let knowledge = collection_with("knowledge", embedder.clone(), Vec::new()).await;

    let context = assembler(embedder).retrieve_knowledge("q", &knowledge, 50).await.unwrap();
    assert!(context.is_empty());
    assert_eq!(context.text(), "");
}

#[tokio::test]
async fn test_knowledge_keeps_store_order() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TableEmbedder::default());
    let knowledge = collection_with(
        "knowledge",
        embedder.clone(),
        vec![
            point("c", [0.6, 0.8, 0.0], knowledge_payload("third")),
            point("a", [1.0, 0.0, 0.0], knowledge_payload("first")),
            point("b", [0.8, 0.6, 0.0], knowledge_payload("second")),
        ],
    )
    .await;

    let context = assembler(embedder.clone())
        .retrieve_knowledge("q", &knowledge, 50)
        .await
        .unwrap();
    assert_eq!(context.text(), "first second third");

    let top_two = assembler(embedder)
        .retrieve_knowledge("q", &knowledge, 2)
        .await
        .unwrap();
    assert_eq!(top_two.contents, vec!["first", "second"]);
}

#[tokio::test]
async fn test_rerank_is_stable_permutation() {
    let embedder = corpus_embedder();
    let knowledge = knowledge_corpus(embedder.clone()).await;
    let reranker = Arc::new(TableReranker::new(&[("B", 0.9), ("A", 0.5), ("C", 0.5), ("A2", 0.1)]));

    let mut retriever = Retriever::new("q", knowledge, embedder).with_reranker(reranker);
    let found: Vec<String> = retriever
        .similarity_search(10)
        .await
        .unwrap()
        .iter()
        .map(|d| d.id.clone())
        .collect();
    assert_eq!(found, vec!["a", "a2", "b", "c"]);

    let ranked: Vec<String> = retriever
        .rerank(&["content"])
        .await
        .unwrap()
        .iter()
        .map(|r| r.document.id.clone())
        .collect();

    assert_eq!(ranked, vec!["b", "a", "c", "a2"]);
    let found_set: HashSet<_> = found.iter().collect();
    let ranked_set: HashSet<_> = ranked.iter().collect();
    assert_eq!(found_set, ranked_set);
    assert!(retriever.is_reranked());
}

#[tokio::test]
async fn test_rerank_without_reranker_fails() {
    let embedder = corpus_embedder();
    let knowledge = knowledge_corpus(embedder.clone()).await;

    let mut retriever = Retriever::new("q", knowledge, embedder);
    retriever.similarity_search(10).await.unwrap();
    let result = retriever.rerank(&["content"]).await;

    assert!(matches!(result, Err(RagError::MissingCollaborator("reranker"))));
}

#[tokio::test]
async fn test_cosine_filter_drops_near_duplicates() {
    let embedder = corpus_embedder();
    let knowledge = knowledge_corpus(embedder.clone()).await;

    let mut retriever = Retriever::new("q", knowledge, embedder);
    retriever.similarity_search(10).await.unwrap();

    let kept = retriever.cosine_filter(&["content"], 0.8, 10).await.unwrap().to_vec();
    assert_eq!(kept, vec!["A", "B", "C"]);
    assert_eq!(retriever.filtered_embeddings().len(), 3);

    let capped = retriever.cosine_filter(&["content"], 0.8, 2).await.unwrap().to_vec();
    assert_eq!(capped, vec!["A", "B"]);
}

#[tokio::test]
async fn test_cosine_filter_skips_documents_without_text() {
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(TableEmbedder::new(&[
        ("A", [1.0, 0.0, 0.0]),
        ("B", [0.0, 1.0, 0.0]),
    ]));
    let summary_only = Payload {
        summary: Some("summary without content".to_string()),
        ..Payload::default()
    };
    let knowledge = collection_with(
        "knowledge",
        embedder.clone(),
        vec![
            point("blank", [1.0, 0.0, 0.0], summary_only),
            point("a", [0.99, 0.01, 0.0], knowledge_payload("A")),
            point("b", [0.0, 1.0, 0.0], knowledge_payload("B")),
        ],
    )
    .await;

    let mut retriever = Retriever::new("A", knowledge.clone(), embedder.clone());
    retriever.similarity_search(10).await.unwrap();
    assert_eq!(retriever.found_docs()[0].id, "blank");
    let kept = retriever.cosine_filter(&["content"], 0.8, 2).await.unwrap().to_vec();
    assert_eq!(kept, vec!["A", "B"]);
    assert_eq!(retriever.filtered_embeddings().len(), 2);

    let settings = RetrievalSettings {
        use_diversity_filter: true,
        diversity_cap: 2,
        ..RetrievalSettings::default()
    };
    let context = ContextAssembler::new(embedder, settings)
        .retrieve_knowledge("A", &knowledge, 10)
        .await
        .unwrap();
    assert_eq!(context.contents, vec!["A", "B"]);
}

#[tokio::test]
async fn test_cosine_filter_output_is_subsequence() {
    let embedder = corpus_embedder();
    let knowledge = knowledge_corpus(embedder.clone()).await;
    let reranker = Arc::new(TableReranker::new(&[("C", 1.0), ("A2", 0.8), ("A", 0.7), ("B", 0.1)]));

    let mut retriever = Retriever::new("q", knowledge, embedder).with_reranker(reranker);
    retriever.similarity_search(10).await.unwrap();
    retriever.rerank(&["content"]).await.unwrap();
    let candidates: Vec<String> = retriever
        .reranked_docs()
        .iter()
        .map(|r| r.document.payload.text_of(&["content"]))
        .collect();

    for k in 0..=5 {
        let kept = retriever.cosine_filter(&["content"], 0.8, k).await.unwrap().to_vec();
        assert!(kept.len() <= k);
        let mut rest = candidates.iter();
        assert!(kept.iter().all(|item| rest.any(|c| c == item)));
    }
}

#[tokio::test]
async fn test_new_search_resets_later_steps() {
    let embedder = corpus_embedder();
    let knowledge = knowledge_corpus(embedder.clone()).await;
    let reranker = Arc::new(TableReranker::new(&[]));

    let mut retriever = Retriever::new("q", knowledge, embedder).with_reranker(reranker);
    retriever.similarity_search(10).await.unwrap();
    retriever.rerank(&["content"]).await.unwrap();
    retriever.cosine_filter(&["content"], 0.8, 10).await.unwrap();

    retriever.similarity_search(2).await.unwrap();
    assert!(!retriever.is_reranked());
    assert!(retriever.reranked_docs().is_empty());
    assert!(retriever.filtered_contents().is_empty());
    assert_eq!(retriever.found_docs().len(), 2);
}

#[tokio::test]
async fn test_slow_reranker_times_out() {
    let embedder = corpus_embedder();
    let knowledge = knowledge_corpus(embedder.clone()).await;

    let mut retriever = Retriever::new("q", knowledge, embedder)
        .with_reranker(Arc::new(SlowReranker(Duration::from_secs(5))))
        .with_timeout(Duration::from_millis(20));
    retriever.similarity_search(10).await.unwrap();

    match retriever.rerank(&["content"]).await {
        Err(RagError::Timeout { operation, duration_ms }) => {
            assert_eq!(operation, "rerank");
            assert_eq!(duration_ms, 20);
        }
        other => panic!("expected timeout, got {:?}", other.map(|r| r.len())),
    }
}

#[tokio::test]
async fn test_assembler_with_rerank_and_diversity() {
    let embedder = corpus_embedder();
    let knowledge = knowledge_corpus(embedder.clone()).await;
    let settings = RetrievalSettings {
        use_reranking: true,
        use_diversity_filter: true,
        ..RetrievalSettings::default()
    };
    let reranker = Arc::new(TableReranker::new(&[("C", 1.0), ("A2", 0.9), ("A", 0.8), ("B", 0.7)]));

    let context = ContextAssembler::new(embedder, settings)
        .with_reranker(reranker)
        .retrieve_knowledge("q", &knowledge, 10)
        .await
        .unwrap();

    assert_eq!(context.contents, vec!["C", "A2", "B"]);
}

#[tokio::test]
async fn test_assembler_rerank_enabled_without_reranker_fails() {
    let embedder = corpus_embedder();
    let knowledge = knowledge_corpus(embedder.clone()).await;
    let settings = RetrievalSettings {
        use_reranking: true,
        ..RetrievalSettings::default()
    };

    let result = ContextAssembler::new(embedder, settings)
        .retrieve_knowledge("q", &knowledge, 10)
        .await;
    assert!(matches!(result, Err(RagError::MissingCollaborator(_))));
}

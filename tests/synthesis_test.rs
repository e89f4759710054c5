use rust_litreview_mcp::tools::{AnalyzeInput, AnalyzeTool};
use rust_litreview_mcp::{synthesize, Config, ExtractedDocument};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn extracted(title: &str, year: serde_json::Value, keywords: &[&str]) -> serde_json::Value {
    json!({
        "title": title,
        "year": year,
        "doi": null,
        "authors": ["Ada Lovelace"],
        "full_text_length": 1200,
        "abstract": "Abstract text",
        "introduction": "",
        "methodology": "Methods text",
        "results": "",
        "conclusion": "",
        "keywords": keywords
    })
}

#[test]
fn test_shared_keyword_forms_one_theme() {
    let documents: Vec<ExtractedDocument> = serde_json::from_value(json!([
        extracted("Hospital Networks", json!(2024), &["healthcare", "networks"]),
        extracted("Clinical Models", json!(2022), &["healthcare", "clinical"]),
    ]))
    .unwrap();

    let synthesis = synthesize(&documents);

    let healthcare = synthesis
        .themes
        .iter()
        .find(|t| t.keyword == "healthcare")
        .unwrap();
    assert_eq!(healthcare.theme_name, "Healthcare");
    assert_eq!(healthcare.paper_count, 2);
    assert_eq!(healthcare.papers.len(), 2);
    assert_eq!(
        synthesis.themes.iter().filter(|t| t.keyword == "healthcare").count(),
        1
    );

    assert_eq!(synthesis.keyword_frequency[0].keyword, "healthcare");
    assert_eq!(synthesis.keyword_frequency[0].count, 2);
    assert_eq!(synthesis.total_papers, 2);
    assert_eq!(synthesis.statistics.avg_text_length, 1200);
    assert_eq!(synthesis.statistics.papers_with_methodology, 2);
    assert_eq!(synthesis.statistics.papers_with_conclusion, 0);
    assert_eq!(synthesis.statistics.unique_authors, 1);
    assert_eq!(synthesis.paper_groupings.recent_papers, 1);
    assert_eq!(synthesis.paper_groupings.older_papers, 1);
}

#[tokio::test]
async fn test_analyze_writes_synthesis_file() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.output.directory = temp_dir.path().join("outputs");

    let input = temp_dir.path().join("extracted_content.json");
    let documents = json!([
        extracted("Known Year", json!(2023), &["graphs"]),
        extracted("Unknown Year", json!("Unknown"), &["graphs", "trees"]),
    ]);
    std::fs::write(&input, documents.to_string()).unwrap();

    let tool = AnalyzeTool::new(Arc::new(config.clone()));
    let value = tool
        .run(AnalyzeInput {
            extracted_content_file: input,
        })
        .await;

    assert_eq!(value["total_papers"], 2);
    assert_eq!(value["year_distribution"], json!({"2023": 1}));
    assert_eq!(value["themes"][0]["theme_name"], "Graphs");
    assert_eq!(value["themes"][0]["paper_count"], 2);

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(config.output.synthesis_file()).unwrap()).unwrap();
    assert_eq!(written, value);
}

#[tokio::test]
async fn test_analyze_missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.output.directory = temp_dir.path().join("outputs");

    let value = AnalyzeTool::new(Arc::new(config.clone()))
        .run(AnalyzeInput {
            extracted_content_file: temp_dir.path().join("nope.json"),
        })
        .await;

    assert!(value["error"].as_str().unwrap().contains("not found"));
    assert!(!config.output.synthesis_file().exists());
}

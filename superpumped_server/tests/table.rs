use axum::http::StatusCode;
use serde_json::json;
use superpumped_server::models::table::UpdateTableRequest;

mod utils;

#[tokio::test]
async fn removing_a_column_drops_it_from_rows() -> Result<(), Box<dyn std::error::Error>> {
    let app = utils::test_app().await?;
    let request = UpdateTableRequest::builder()
        .prompt("remove the last name column".to_string())
        .config(json!({
            "data": [
                {"firstName": "John", "lastName": "Doe"},
                {"firstName": "Jane", "lastName": "Doe"}
            ],
            "columns": [
                {"accessorKey": "firstName", "header": "First Name"},
                {"accessorKey": "lastName", "header": "Last Name"}
            ],
            "enableGrouping": true
        }))
        .build();
    let (status, body) = utils::send(&app, utils::json_request("POST", "/mrt", &request)).await;
    assert_eq!(status, StatusCode::OK);

    let updated = &utils::json_body(&body)["updatedConfig"];
    let rows = updated["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.get("lastName").is_none()));
    assert_eq!(updated["columns"].as_array().unwrap().len(), 1);
    assert_eq!(updated["enableGrouping"], true);
    Ok(())
}

#[tokio::test]
async fn table_update_needs_prompt_and_table() -> Result<(), Box<dyn std::error::Error>> {
    let app = utils::test_app().await?;
    let no_table = json!({"prompt": "sort by name"});
    let (status, body) = utils::send(&app, utils::json_request("POST", "/mrt", &no_table)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(utils::text(&body), "missing table configuration");

    let no_prompt = json!({"config": {"data": [], "columns": []}});
    let (status, body) = utils::send(&app, utils::json_request("POST", "/mrt", &no_prompt)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(utils::text(&body), "missing prompt");
    Ok(())
}

#[tokio::test]
async fn truncated_table_output_is_a_server_error() -> Result<(), Box<dyn std::error::Error>> {
    let app = utils::test_app().await?;
    let request = UpdateTableRequest::builder()
        .prompt("this reply gets cut off".to_string())
        .config(json!({
            "data": [{"firstName": "John", "lastName": "Doe"}],
            "columns": [
                {"accessorKey": "firstName", "header": "First Name"},
                {"accessorKey": "lastName", "header": "Last Name"}
            ]
        }))
        .build();
    let (status, body) = utils::send(&app, utils::json_request("POST", "/mrt", &request)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(utils::text(&body), "Invalid table configuration from AI");
    Ok(())
}

#[tokio::test]
async fn table_chat_streams_an_answer() -> Result<(), Box<dyn std::error::Error>> {
    let app = utils::test_app().await?;
    let request = json!({"prompt": "who is first?", "data": [{"name": "Ann"}]});
    let (status, body) = utils::send(&app, utils::json_request("POST", "/mrt-chat", &request)).await;
    assert_eq!(status, StatusCode::OK);
    let answer = utils::text(&body);
    assert!(answer.starts_with("echo: "));
    assert!(answer.contains("who is first?"));
    assert!(answer.contains("Ann"));
    Ok(())
}

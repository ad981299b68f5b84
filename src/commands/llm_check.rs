//! Test an LLM endpoint before enabling auto-replies

use crate::error::Result;
use crate::integrations::llm::check_connection;

pub async fn run(api_url: &str, api_key: Option<String>) -> Result<String> {
    println!("Checking LLM endpoint {}...", api_url);
    match check_connection(api_url, api_key).await {
        Ok(answer) => {
            println!("✓ Endpoint answered: {}", answer);
            Ok(answer)
        }
        Err(e) => {
            println!("✗ {}", e);
            Err(e)
        }
    }
}

use secrecy::SecretString;
use textgen_api::{Client, Request, TextGenError};

#[tokio::main]
pub async fn main() -> Result<(), TextGenError> {
    let api_key = SecretString::from("api_key".to_string());
    let client = Client::new(&api_key);

    let req = Request::chat()
        .prompt(
            "gpt-4o-mini",
            "You are a helpful copywriter.",
            "Write a one-line launch announcement.",
        )
        .temperature(0.7_f32);

    let res = client.send(req).await?;
    println!("{}", res.first_text().unwrap_or_default());
    Ok(())
}

use miette::{miette, IntoDiagnostic};
use scheduleai::components::calendar::token::GOOGLE_TOKEN_URL;
use scheduleai::components::calendar::{StoredToken, TokenManager};
use scheduleai::config::Config;
use scheduleai::error::config_error;
use url::Url;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const REDIRECT_URI: &str = "http://localhost:8080";
const SCOPE: &str = "https://www.googleapis.com/auth/calendar.events";

#[tokio::main]
async fn main() -> miette::Result<()> {
    let config = Config::load()?;

    if config.google_client_id.is_empty() || config.google_client_secret.is_empty() {
        return Err(config_error("GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET must be set").into());
    }

    let token_manager = TokenManager::new(
        config.google_token_path.clone(),
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    )?;

    // Random state guards against a forged callback
    let state = uuid::Uuid::new_v4().to_string();

    let mut auth_url = Url::parse(AUTH_URL).into_diagnostic()?;
    auth_url
        .query_pairs_mut()
        .append_pair("client_id", &config.google_client_id)
        .append_pair("redirect_uri", REDIRECT_URI)
        .append_pair("response_type", "code")
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent")
        .append_pair("scope", SCOPE)
        .append_pair("state", &state);

    println!("Opening browser for Google Calendar authorization...");
    if webbrowser::open(auth_url.as_str()).is_err() {
        println!("Could not open a browser, visit this URL instead:\n{}", auth_url);
    }

    let server = tiny_http::Server::http("127.0.0.1:8080").map_err(|e| miette!("{}", e))?;
    println!("Waiting for authorization callback...");

    let request = server.recv().into_diagnostic()?;
    let callback = Url::parse(REDIRECT_URI)
        .and_then(|base| base.join(request.url()))
        .into_diagnostic()?;

    let mut code = None;
    let mut returned_state = None;
    for (key, value) in callback.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => returned_state = Some(value.into_owned()),
            _ => {}
        }
    }

    if returned_state.as_deref() != Some(state.as_str()) {
        return Err(miette!("Authorization state did not match, aborting"));
    }
    let code = code.ok_or_else(|| miette!("No authorization code found in callback"))?;

    let response = reqwest::Client::new()
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("client_id", config.google_client_id.as_str()),
            ("client_secret", config.google_client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", REDIRECT_URI),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .into_diagnostic()?;

    if !response.status().is_success() {
        let error_text = response.text().await.into_diagnostic()?;
        return Err(miette!("Failed to get token: {}", error_text));
    }

    let token_data: serde_json::Value = response.json().await.into_diagnostic()?;
    let token = StoredToken::from_oauth_response(&token_data, None)?;
    token_manager.set_token(token).await?;

    let page =
        tiny_http::Response::from_string("Authorization successful! You can close this window.");
    request.respond(page).into_diagnostic()?;

    println!("Token saved to {}", token_manager.path().display());

    Ok(())
}

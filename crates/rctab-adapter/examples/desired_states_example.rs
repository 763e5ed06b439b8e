/*
[INPUT]:  API_URL and PRIVATE_KEY environment variables
[OUTPUT]: Printed desired-state list from the accounting API
[POS]:    Examples - bearer auth and desired-states query demonstration
[UPDATE]: When the desired-states endpoint changes
*/

use rctab_adapter::{ApiAuth, RctabClient};

/// Example: fetch desired subscription states
///
/// 1. Build a bearer signer from the pre-shared RSA key
/// 2. Create the accounting API client
/// 3. Query accounting/desired-states and print the result
#[tokio::main]
async fn main() {
    let api_url = match std::env::var("API_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("API_URL must be set, e.g. https://my.rctab.host");
            return;
        }
    };
    let private_key = match std::env::var("PRIVATE_KEY") {
        Ok(key) => key,
        Err(_) => {
            eprintln!("PRIVATE_KEY must be set to a PEM-encoded RSA private key");
            return;
        }
    };

    let auth = match ApiAuth::new(&private_key, "controller-app") {
        Ok(auth) => auth,
        Err(e) => {
            eprintln!("Failed to load private key: {e}");
            return;
        }
    };

    let client = match RctabClient::new(&api_url, auth) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create client: {e}");
            return;
        }
    };

    match client.get_desired_states().await {
        Ok(states) => {
            println!("{} subscriptions need a state change", states.len());
            for state in states {
                println!("  {} -> {:?}", state.subscription_id, state.desired_state);
            }
        }
        Err(e) => eprintln!("Request failed: {e}"),
    }
}

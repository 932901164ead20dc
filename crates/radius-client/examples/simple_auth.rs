use radius_client::Client;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!(
            "Usage: {} <username> <password> <secret> [server] [pap|chap|mschapv1|eap]",
            args[0]
        );
        eprintln!("Example: {} admin admin123 testing123 127.0.0.1 eap", args[0]);
        std::process::exit(1);
    }

    let username = &args[1];
    let password = &args[2];
    let secret = &args[3];
    let server = args.get(4).map(|s| s.as_str()).unwrap_or("127.0.0.1");
    let method = args.get(5).map(|s| s.as_str()).unwrap_or("pap");

    println!("RADIUS Authentication Test");
    println!("==========================");
    println!("Server: {}:1812", server);
    println!("Username: {}", username);
    println!("Method: {}", method);
    println!();

    let mut client = Client::new(server, secret.as_str());
    client.set_timeout(Duration::from_secs(5));

    let accepted = match method {
        "pap" => client.authenticate_pap(username, password, None),
        "chap" => client.authenticate_chap(username, password),
        "mschapv1" => client.authenticate_ms_chap_v1(username, password),
        "eap" => client.authenticate_eap_ms_chap_v2(username, password),
        other => {
            eprintln!("Unknown method: {}", other);
            std::process::exit(2);
        }
    };

    if accepted {
        println!("✓ Authentication SUCCESSFUL!");
        if let Some(message) = client.reply_message() {
            println!("  Message: {}", message);
        }
    } else {
        println!("✗ Authentication FAILED!");
        println!(
            "  Error {}: {}",
            client.last_error_code(),
            client.last_error_message()
        );
        if let Some(code) = client.received_packet_code() {
            println!("  Last response code: {}", code);
        }
    }

    std::process::exit(if accepted { 0 } else { 1 });
}

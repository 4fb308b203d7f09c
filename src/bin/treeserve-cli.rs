use clap::{Parser, Subcommand};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "treeserve-cli")]
#[command(about = "Inspect and call a running treeserve instance", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List discovered endpoints
    Endpoints,
    /// Print the API description document
    Spec,
    /// POST to a handler and print the response
    Call {
        /// Handler path, e.g. /api/users/list
        path: String,

        /// JSON body
        #[arg(long, conflicts_with_all = ["text", "form"])]
        json: Option<String>,

        /// Plain text body
        #[arg(long, conflicts_with = "form")]
        text: Option<String>,

        /// Form field as key=value; repeatable
        #[arg(long, value_parser = parse_field)]
        form: Vec<(String, String)>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Endpoints => {
            let doc: Value = client
                .get(format!("{base}/__api/spec.json"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            print_endpoints(&doc);
        }
        Commands::Spec => {
            let doc: Value = client
                .get(format!("{base}/__api/spec.json"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        Commands::Call {
            path,
            json,
            text,
            form,
        } => {
            let url = format!("{base}/{}", path.trim_start_matches('/'));
            let request = client.post(url);
            let request = if let Some(json) = json {
                let body: Value = serde_json::from_str(&json)?;
                request.json(&body)
            } else if let Some(text) = text {
                request
                    .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                    .body(text)
            } else if !form.is_empty() {
                request
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(encode_form(&form))
            } else {
                request
            };
            print_response(request.send().await?).await?;
        }
    }

    Ok(())
}

fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn print_endpoints(doc: &Value) {
    let Some(paths) = doc["paths"].as_object() else {
        return;
    };
    for (path, methods) in paths {
        let Some(methods) = methods.as_object() else {
            continue;
        };
        for (method, op) in methods {
            println!(
                "{:<6} {:<40} {}",
                method.to_uppercase(),
                path,
                op["summary"].as_str().unwrap_or("")
            );
        }
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let body = res.text().await?;
    println!("{status}");
    match serde_json::from_str::<Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }
    Ok(())
}

use anyhow::Context as _;
use aws_config::BehaviorVersion;
use aws_sdk_lambda::Client;
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::Instant;

const AUTHORS: &[&str] = &["Ann", "Bob", "Карина", "Dmitri", "Eve"];
const TEXTS: &[&str] = &["Nice shot!", "Great light", "Отличное фото", "Where is this?"];

#[derive(Default)]
struct Stats {
    success_count: usize,
    error_count: usize,
    total_latency_ms: f64,
}

/// The proxy response the comments function returns.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayResponse {
    status_code: u16,
    body: String,
}

#[derive(Parser, Debug)]
#[command(name = "invoke-test")]
#[command(about = "Invoke the comments Lambda function")]
struct Args {
    /// Lambda function name
    function: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List comments, optionally for one story
    List {
        #[arg(long)]
        story_id: Option<i32>,
    },

    /// Create a single comment
    Create {
        #[arg(long)]
        story_id: i32,

        #[arg(long)]
        author: String,

        #[arg(long)]
        text: String,
    },

    /// Post random comments in parallel and report latency
    Load {
        /// Number of iterations to run
        #[arg(long, default_value = "1000")]
        iters: usize,

        /// Number of parallel threads
        #[arg(long, default_value = "1")]
        threads: usize,

        /// Number of stories (1 to N)
        #[arg(long, default_value = "10")]
        stories: i32,
    },
}

fn list_event(story_id: Option<i32>) -> Value {
    let params = story_id.map(|id| json!({ "story_id": id.to_string() }));
    json!({
        "httpMethod": "GET",
        "queryStringParameters": params,
        "body": null,
    })
}

fn create_event(story_id: i32, author: &str, text: &str) -> Value {
    let body = json!({ "story_id": story_id, "author": author, "text": text });
    json!({
        "httpMethod": "POST",
        "queryStringParameters": null,
        "body": body.to_string(),
    })
}

async fn invoke(
    client: &Client,
    function_name: &str,
    event: &Value,
) -> anyhow::Result<GatewayResponse> {
    let response = client
        .invoke()
        .function_name(function_name)
        .payload(aws_sdk_lambda::primitives::Blob::new(serde_json::to_vec(event)?))
        .send()
        .await
        .context("invoke failed")?;

    let payload = response
        .payload()
        .map(|b| String::from_utf8_lossy(b.as_ref()).to_string())
        .unwrap_or_default();

    if let Some(function_error) = response.function_error() {
        anyhow::bail!("function error ({function_error}): {payload}");
    }

    serde_json::from_str(&payload).with_context(|| format!("unexpected response: {payload}"))
}

async fn run_invocations(
    client: Arc<Client>,
    function_name: String,
    thread_id: usize,
    start: usize,
    end: usize,
    total: usize,
    num_stories: i32,
    stats: Arc<Mutex<Stats>>,
) {
    let mut rng = StdRng::from_entropy();

    for i in start..=end {
        let story_id = rng.gen_range(1..=num_stories);
        let author = AUTHORS.choose(&mut rng).copied().unwrap_or("Ann");
        let text = TEXTS.choose(&mut rng).copied().unwrap_or("Hi");

        let event = create_event(story_id, author, text);
        let started = Instant::now();
        let result = invoke(&client, &function_name, &event).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(response) if response.status_code == 201 => {
                {
                    let mut stats = stats.lock().await;
                    stats.success_count += 1;
                    stats.total_latency_ms += latency_ms;
                }

                println!(
                    "[Thread {}: {}/{}] Commenting on story {} as {} => {}",
                    thread_id, i, total, story_id, author, response.body
                );
            }
            Ok(response) => {
                stats.lock().await.error_count += 1;

                eprintln!(
                    "[Thread {}: {}/{}] Story {} rejected with {}: {}",
                    thread_id, i, total, story_id, response.status_code, response.body
                );
            }
            Err(e) => {
                stats.lock().await.error_count += 1;

                eprintln!(
                    "[Thread {}: {}/{}] Error commenting on story {}: {:#}",
                    thread_id, i, total, story_id, e
                );
            }
        }
    }
}

async fn run_load(
    client: Arc<Client>,
    function: String,
    iters: usize,
    threads: usize,
    stories: i32,
) {
    let threads = threads.max(1);
    let stories = stories.max(1);

    println!("Running {} invocations across {} thread(s)", iters, threads);

    let stats = Arc::new(Mutex::new(Stats::default()));

    // Calculate iterations per thread
    let iters_per_thread = iters / threads;
    let remainder = iters % threads;

    let mut tasks = JoinSet::new();

    let mut start = 1;
    for t in 1..=threads {
        let end = if t == threads {
            start + iters_per_thread - 1 + remainder
        } else {
            start + iters_per_thread - 1
        };

        let client = Arc::clone(&client);
        let function_name = function.clone();
        let stats = Arc::clone(&stats);

        tasks.spawn(async move {
            run_invocations(client, function_name, t, start, end, iters, stories, stats).await;
        });

        start = end + 1;
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            eprintln!("Task failed: {}", e);
        }
    }

    let stats = stats.lock().await;
    println!("Completed {} invocations", iters);
    println!();
    println!("Results:");
    println!("  Success: {}", stats.success_count);
    println!("  Errors:  {}", stats.error_count);
    if stats.success_count > 0 {
        let avg_latency = stats.total_latency_ms / stats.success_count as f64;
        println!("  Avg latency: {:.3}ms", avg_latency);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let client = Arc::new(Client::new(&config));

    match args.command {
        Command::List { story_id } => {
            let response = invoke(&client, &args.function, &list_event(story_id)).await?;
            println!("{} {}", response.status_code, response.body);
        }
        Command::Create {
            story_id,
            author,
            text,
        } => {
            let event = create_event(story_id, &author, &text);
            let response = invoke(&client, &args.function, &event).await?;
            println!("{} {}", response.status_code, response.body);
        }
        Command::Load {
            iters,
            threads,
            stories,
        } => run_load(client, args.function, iters, threads, stories).await,
    }

    Ok(())
}

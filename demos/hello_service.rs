use std::net::IpAddr;
use std::time::Duration;

use log::*;
use serde_json::json;
use structopt::StructOpt;

use jbapi::prelude::*;
use jbapi::server::TcpServer;

const GREETINGS: [&str; 3] = ["hello", "bonjour", "hola"];

fn is_greeting(value: &str) -> bool {
    GREETINGS.contains(&value.to_ascii_lowercase().as_str())
}

fn greet(params: &Params, response: &mut Response) {
    let name = params.get("name").unwrap_or("world");
    let greeting = params.get("greeting").unwrap_or("hello");
    response.set(format!("{}, {}!", greeting, name), 200)
}

fn echo(params: &Params, response: &mut Response) {
    let mut echoed = serde_json::Map::new();
    for (name, value) in params.iter() {
        echoed.insert(name.clone(), json!(value));
    }
    response.set(echoed, 200)
}

fn hello() -> Endpoint {
    Endpoint::new()
        .get(Route::new("/hello", "greet"))
        .get(
            Route::new("/hello/:name", "greet")
                .param(
                    "name",
                    ParamRule::required()
                        .constraint("^[A-Za-z]+$")
                        .description("who to greet"),
                )
                .param("greeting", ParamRule::optional().validator("is_greeting"))
                .output_handler("plain"),
        )
        .post(
            Route::new("/hello/echo/*", "echo")
                .param("message", ParamRule::required())
                .output_handler_param("as"),
        )
        .handler("greet", greet)
        .handler("echo", echo)
        .validator("is_greeting", is_greeting)
}

fn setup_logging(verbosity: usize) {
    stderrlog::new()
        .module(module_path!())
        .module("jbapi")
        .verbosity(verbosity)
        .timestamp(stderrlog::Timestamp::Millisecond)
        .init()
        .unwrap();
}

#[derive(Debug, StructOpt)]
#[structopt(name = "hello_service", about = "Example versioned API server.")]
struct Opt {
    #[structopt(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,
    #[structopt(short, long, default_value = "8080")]
    port: u16,
    /// Accept and read timeout, in seconds
    #[structopt(short, long, default_value = "3")]
    timeout: u64,
    /// Wrap responses in an endpoint/version/status envelope
    #[structopt(long)]
    detail: bool,
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,
}

fn main() {
    let opt = Opt::from_args();
    setup_logging(opt.verbose);

    let app = App::new()
        .with_defaults(Defaults::default().with_response_detail(opt.detail))
        .with_endpoint("hello", "v1", hello);

    let config = ServerConfig::new(opt.bind, opt.port).with_timeout(Duration::from_secs(opt.timeout));
    let mut server = match TcpServer::bind(config, app) {
        Ok(server) => server,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    server.serve_forever();
}

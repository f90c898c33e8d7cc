#[cfg(unix)]
use tokio::signal::unix::{self, SignalKind};
use {
    crate::{
        api,
        domain::{
            authorizer::Authorizer,
            eth::BLOCK_TIME,
            inventory::Inventory,
            solver::{self, Solver},
        },
        infra::{
            blockchain::{self, Rpc},
            cli,
            config,
            listener,
            matchmaker::Matchmaker,
            observe,
            queue,
            quote,
            relay,
        },
    },
    clap::Parser,
    futures::FutureExt,
    std::{net::SocketAddr, sync::Arc},
    tokio::sync::oneshot,
};

pub async fn start(args: impl IntoIterator<Item = String>) {
    let args = cli::Args::parse_from(args);
    run_with(args, None).await;
}

pub async fn run(
    args: impl IntoIterator<Item = String>,
    bind: Option<oneshot::Sender<SocketAddr>>,
) {
    let args = cli::Args::parse_from(args);
    run_with(args, bind).await;
}

async fn run_with(args: cli::Args, bind: Option<oneshot::Sender<SocketAddr>>) {
    observe::init(&args.log, args.use_json_logs);
    observe::install_panic_hook();
    tracing::info!("running solver service with {args:#?}");

    let config = config::load(&args.config).await;
    let rpc = Rpc::new(&config.node_url);
    let block_watcher = blockchain::current_block_watcher(rpc.clone(), config.block_poll_interval)
        .await
        .expect("node is reachable on boot");

    let aggregator = Arc::new(
        quote::aggregator::Aggregator::new(quote::aggregator::Config {
            endpoint: config.aggregator.endpoint.clone(),
            api_key: config.aggregator.api_key.clone(),
            chain_id: config.chain,
            settlement: config.contracts.settlement_erc20,
            wrapped_native: config.contracts.wrapped_native,
            block_watcher: Some(block_watcher.clone()),
        })
        .expect("invalid aggregator configuration"),
    );
    let erc20_quoter = Arc::new(match &config.sor {
        Some(sor) => quote::Erc20Quoter::Sor(quote::sor::Sor::new(quote::sor::Config {
            endpoint: sor.endpoint.clone(),
            chain_id: config.chain,
            settlement: config.contracts.settlement_erc20,
            permit2: config.contracts.permit2,
            block_watcher: Some(block_watcher.clone()),
        })),
        None => quote::Erc20Quoter::Aggregator(aggregator.clone()),
    });
    let marketplace = quote::marketplace::Marketplace::new(quote::marketplace::Config {
        endpoint: config.marketplace.endpoint.clone(),
        api_key: config.marketplace.api_key.clone(),
        api_secret_key: config.marketplace.api_secret_key.clone(),
        chain_id: config.chain,
        settlement: config.contracts.settlement_erc721,
        wrapped_native: config.contracts.wrapped_native,
        solver: config.solver.clone(),
        block_watcher: Some(block_watcher.clone()),
    })
    .expect("invalid marketplace configuration");

    let private = Arc::new(match &config.bloxroute_auth_token {
        Some(token) => relay::PrivateRelay::Bloxroute {
            simulator: relay::flashbots::Flashbots::new(
                config.flashbots_url.clone(),
                config.relay_identity.clone(),
                rpc.clone(),
            ),
            submitter: relay::bloxroute::Bloxroute::new(
                config.bloxroute_url.clone(),
                token.clone(),
            ),
        },
        None => relay::PrivateRelay::Flashbots(relay::flashbots::Flashbots::new(
            config.flashbots_url.clone(),
            config.relay_identity.clone(),
            rpc.clone(),
        )),
    });
    let public = relay::public::Public::new(rpc.clone());

    let store = crate::infra::store::Store::default();
    let inventory = Inventory::new(
        config.chain,
        config.contracts,
        rpc.clone(),
        config.solver.clone(),
        aggregator.clone(),
    );
    inventory.spawn_scheduler();

    let solver = Solver::new(solver::Config {
        chain: config.chain,
        contracts: config.contracts,
        rpc: rpc.clone(),
        signer: config.solver.clone(),
        erc20: solver::Erc20::new(erc20_quoter),
        erc721: solver::Erc721::new(marketplace),
        public,
        private: private.clone(),
        matchmaker: Matchmaker::new(config.matchmaker_url.clone()),
        store: store.clone(),
        inventory: inventory.clone(),
        relay_directly_when_possible: config.relay_directly_when_possible,
    });

    let solve_options = queue::Options {
        concurrency: 10,
        attempts: 10,
        retry_delay: BLOCK_TIME,
    };
    let handler = |solver: Arc<Solver>| {
        Arc::new(move |job: queue::Job<solver::SolveJob>| solver.clone().process(job).boxed())
    };
    let queues = solver::Queues {
        erc20: queue::Queue::new("solve-erc20", solve_options, handler(solver.clone())),
        erc721: queue::Queue::new("solve-erc721", solve_options, handler(solver.clone())),
    };
    solver.connect(queues.clone());

    let listener = listener::Listener::new(
        config.chain,
        config.contracts,
        rpc.clone(),
        queues.clone(),
    );
    listener::spawn(listener, config.node_ws_url.clone());

    let authorizer = config.matchmaker_signer.clone().map(|signer| {
        Authorizer::new(
            config.chain,
            config.contracts,
            rpc.clone(),
            signer,
            private.clone(),
            store.clone(),
        )
    });

    api::Api {
        addr: args.addr,
        state: api::State::new(api::Inner {
            solver,
            queues,
            store,
            inventory,
            authorizer,
        }),
    }
    .serve(bind, shutdown_signal())
    .await
    .unwrap();
}

#[cfg(unix)]
async fn shutdown_signal() {
    // Intercept main signals for graceful shutdown.
    // Kubernetes sends sigterm, whereas locally sigint (ctrl-c) is most common.
    let mut interrupt = unix::signal(SignalKind::interrupt()).unwrap();
    let mut terminate = unix::signal(SignalKind::terminate()).unwrap();
    tokio::select! {
        _ = interrupt.recv() => (),
        _ = terminate.recv() => (),
    };
}

#[cfg(windows)]
async fn shutdown_signal() {
    // We don't support signal handling on Windows.
    std::future::pending().await
}

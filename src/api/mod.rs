//! The solver's HTTP surface: intent and authorization ingress, liveness,
//! metrics, and queue inspection.

use {
    crate::{
        domain::{authorizer::Authorizer, inventory::Inventory, solver},
        infra::store::Store,
    },
    std::{future::Future, net::SocketAddr, sync::Arc},
    tokio::sync::oneshot,
};

mod routes;

pub struct Api {
    pub addr: SocketAddr,
    pub state: State,
}

/// Shared handler state.
#[derive(Clone)]
pub struct State(Arc<Inner>);

pub struct Inner {
    pub solver: Arc<solver::Solver>,
    pub queues: solver::Queues,
    pub store: Store,
    pub inventory: Inventory,
    pub authorizer: Option<Authorizer>,
}

impl State {
    pub fn new(inner: Inner) -> Self {
        Self(Arc::new(inner))
    }
}

impl std::ops::Deref for State {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Api {
    pub async fn serve(
        self,
        bind: Option<oneshot::Sender<SocketAddr>>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), hyper::Error> {
        let app = routes::router(self.state)
            .layer(tower_http::trace::TraceLayer::new_for_http());

        let server = axum::Server::bind(&self.addr).serve(app.into_make_service());
        if let Some(bind) = bind {
            let _ = bind.send(server.local_addr());
        }
        server.with_graceful_shutdown(shutdown).await
    }
}

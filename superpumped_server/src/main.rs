use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let state = superpumped_server::init().await?;
    let binding_addr = state.server_config.bind_addr.clone();
    let router = superpumped_server::app(state);

    let listener = TcpListener::bind(&binding_addr).await?;
    tracing::info!("listening on {binding_addr}");
    axum::serve(listener, router).await?;
    Ok(())
}

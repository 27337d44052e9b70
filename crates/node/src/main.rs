//! Vault node: serves the service groups over TCP and issues Chunk calls.
#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use rand::RngCore;
use rand::rngs::OsRng;
use tracing::info;
use vault_crypto::NodeKeys;
use vault_rpc::{CallStatus, MessageHandler, MessageTypeRegistry};
use vault_services::chunk::{GetChunkRequest, HasChunkRequest, StoreChunkRequest};
use vault_services::{
    ChunkClient, MemoryChunkService, Unimplemented, bind_account, bind_buffer, bind_chunk,
    bind_chunk_info, bind_vault_sync, definitions,
};
use vault_transport::Endpoint;
use vault_transport_tcp::{TcpServer, TcpTransportFactory};

use crate::config::NodeConfig;
use crate::error::{Error, Result};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Node configuration file
    #[arg(long, global = true, env = "VAULT_NODE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the message-type allocation
    Types,

    /// Serve the service groups until interrupted
    Serve,

    /// Generate a key seed and print it with its public keys
    Keygen,

    /// Store a chunk on a running node
    Store {
        /// Address of the node
        #[arg(long)]
        peer: SocketAddr,

        /// Chunk name
        #[arg(long)]
        name: String,

        /// File holding the chunk content
        #[arg(long)]
        file: PathBuf,
    },

    /// Retrieve a chunk from a running node
    Get {
        /// Address of the node
        #[arg(long)]
        peer: SocketAddr,

        /// Chunk name
        #[arg(long)]
        name: String,

        /// Write the content here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Ask a running node whether it holds a chunk
    Has {
        /// Address of the node
        #[arg(long)]
        peer: SocketAddr,

        /// Chunk name
        #[arg(long)]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = NodeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Types => print_types(&config),
        Command::Serve => serve(config).await,
        Command::Keygen => keygen(),
        Command::Store { peer, name, file } => {
            let data = tokio::fs::read(&file).await?;
            let (status, response) = chunk_client(&config)?
                .store_chunk(
                    Endpoint::from(peer),
                    StoreChunkRequest {
                        chunk_name: name,
                        data: Bytes::from(data),
                    },
                )
                .await;
            check(status)?;
            println!("stored: {}", response.stored);
            Ok(())
        }
        Command::Get { peer, name, output } => {
            let (status, response) = chunk_client(&config)?
                .get_chunk(Endpoint::from(peer), GetChunkRequest { chunk_name: name })
                .await;
            check(status)?;
            if !response.found {
                println!("not found");
                return Ok(());
            }
            match output {
                Some(path) => tokio::fs::write(path, &response.data).await?,
                None => println!("{}", String::from_utf8_lossy(&response.data)),
            }
            Ok(())
        }
        Command::Has { peer, name } => {
            let (status, response) = chunk_client(&config)?
                .has_chunk(Endpoint::from(peer), HasChunkRequest { chunk_name: name })
                .await;
            check(status)?;
            println!("has chunk: {}", response.has_chunk);
            Ok(())
        }
    }
}

fn print_types(config: &NodeConfig) -> Result<()> {
    let registry = MessageTypeRegistry::allocate(config.rpc.base_layer_max_type, &definitions())?;
    for (ids, definition) in registry.iter() {
        println!(
            "{}\t{}\t{}\trequest\t{}",
            ids.request, definition.group, definition.operation, definition.description
        );
        println!(
            "{}\t{}\t{}\tresponse",
            ids.response, definition.group, definition.operation
        );
    }
    Ok(())
}

async fn serve(config: NodeConfig) -> Result<()> {
    let handler = Arc::new(MessageHandler::new(Arc::new(config.context()?)));

    let chunks = Arc::new(MemoryChunkService::with_cache_capacity(
        config.vault_id.clone(),
        config.capacity,
        config.cache_capacity,
    ));
    bind_chunk(&handler, chunks)?;
    let unimplemented = Arc::new(Unimplemented);
    bind_chunk_info(&handler, Arc::clone(&unimplemented))?;
    bind_account(&handler, Arc::clone(&unimplemented))?;
    bind_vault_sync(&handler, Arc::clone(&unimplemented))?;
    bind_buffer(&handler, unimplemented)?;

    let server = TcpServer::bind(config.listen, handler)
        .await?
        .with_read_timeout(config.tcp.read_timeout())
        .start()?;
    info!(
        addr = %server.local_addr(),
        vault_id = %config.vault_id,
        capacity = config.capacity,
        cache_capacity = config.cache_capacity,
        "vault node serving"
    );

    let _ = tokio::signal::ctrl_c().await;
    info!("Received interrupt signal");

    server.shutdown().await;
    Ok(())
}

fn keygen() -> Result<()> {
    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    let keys = NodeKeys::from_seed(&seed)?;

    println!("seed_hex = \"{}\"", hex::encode(seed));
    println!("public_hex = \"{}\"", keys.public().to_hex());
    Ok(())
}

fn chunk_client(config: &NodeConfig) -> Result<ChunkClient<TcpTransportFactory>> {
    Ok(ChunkClient::new(
        Arc::new(config.context()?),
        TcpTransportFactory::new(config.tcp.clone()),
    ))
}

fn check(status: CallStatus) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Call(status))
    }
}

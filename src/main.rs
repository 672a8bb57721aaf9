/*!
 * Webtop Kernel - Main Entry Point
 *
 * Boots the desktop core:
 * - Loads configuration
 * - Mounts the configured filesystems
 * - Sets up process management and auth handlers
 */

use anyhow::Context;
use tracing::info;

use webtop_kernel::vfs::MountFilter;
use webtop_kernel::{init_tracing, Kernel, KernelConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Webtop kernel starting...");

    let config = KernelConfig::load().context("loading configuration")?;
    info!(
        server = %config.connection.url,
        fs_uri = %config.connection.fs_uri,
        "Configuration ready"
    );

    let kernel = Kernel::builder(config)
        .build()
        .context("building kernel")?;

    let filter = MountFilter {
        include_special: true,
        include_hidden: true,
    };
    for mount in kernel.vfs().mounts().list(filter) {
        info!(
            name = %mount.name,
            root = %mount.root,
            transport = mount.transport.name(),
            read_only = mount.options.read_only,
            "Mounted"
        );
    }

    info!("Kernel ready, press Ctrl+C to exit");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;

    kernel.shutdown();
    info!("Kernel stopped");
    Ok(())
}

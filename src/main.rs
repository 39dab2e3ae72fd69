use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use lanpair::{logger, ConnectionController, LinkConfig, Phase, SessionEvent, SignalFormat};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast;

/// Pair two machines on the same network over a WebRTC data channel.
/// Signals are printed to stdout and read from stdin; log lines go to stderr.
#[derive(Parser)]
#[command(name = "lanpair", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    link: LinkArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Print an offer, then wait for the joiner's answer on stdin
    Host,
    /// Answer a host's offer
    Join {
        /// Offer text; read from stdin when omitted
        #[arg(long)]
        offer: Option<String>,
    },
}

#[derive(Args)]
struct LinkArgs {
    /// Seconds to wait for candidate gathering, 0 waits forever
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Also offer loopback candidates (both peers on this machine)
    #[arg(long, global = true)]
    loopback: bool,

    /// Exchange browser-style JSON instead of the compact form
    #[arg(long, global = true)]
    json: bool,

    /// STUN/TURN server, repeatable. None keeps the link LAN-only.
    #[arg(long = "ice", global = true)]
    ice_servers: Vec<String>,
}

impl LinkArgs {
    fn link_config(&self) -> LinkConfig {
        let timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
        let format = if self.json {
            SignalFormat::Json
        } else {
            SignalFormat::Compact
        };
        LinkConfig::default()
            .with_ice_servers(&self.ice_servers)
            .with_gathering_timeout(timeout)
            .with_loopback(self.loopback)
            .with_signal_format(format)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();
    let cli = Cli::parse();

    let controller = ConnectionController::new(cli.link.link_config());
    controller.on_data_received(|data| println!("< {}", data));
    let mut events = controller.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    match cli.command {
        Command::Host => {
            let offer = controller.start_host().await.context("failed to create offer")?;
            println!("{}", offer);
            eprintln!("Send the offer above to the joiner, then paste their answer:");
            let answer = read_signal(&mut stdin).await?;
            controller
                .set_answer(&answer)
                .await
                .context("failed to apply answer")?;
        }
        Command::Join { offer } => {
            let offer = match offer {
                Some(offer) => offer,
                None => {
                    eprintln!("Paste the host's offer:");
                    read_signal(&mut stdin).await?
                }
            };
            let answer = controller
                .join_host(&offer)
                .await
                .context("failed to create answer")?;
            println!("{}", answer);
            eprintln!("Send the answer above back to the host");
        }
    }

    wait_for_open(&controller, &mut events).await?;
    if let Some(code) = controller.verification_code().await {
        eprintln!("Connected. Verification code: {} (must match the other side)", code);
    } else {
        eprintln!("Connected.");
    }

    let result = relay(&controller, &mut stdin, &mut events).await;
    controller.close().await;
    result
}

async fn read_signal(stdin: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<String> {
    while let Some(line) = stdin.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            return Ok(line.to_string());
        }
    }
    bail!("stdin closed before a signal was received")
}

async fn wait_for_open(
    controller: &ConnectionController,
    events: &mut broadcast::Receiver<SessionEvent>,
) -> anyhow::Result<()> {
    while !controller.is_connected() {
        match events.recv().await {
            Ok(SessionEvent::ChannelOpen { .. }) => break,
            Ok(SessionEvent::PhaseChanged { phase, .. }) if phase.is_terminal() => {
                bail!("connection ended before the channel opened ({})", phase)
            }
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => bail!("controller stopped"),
        }
    }
    Ok(())
}

/// Send stdin lines until stdin closes or the channel goes away
async fn relay(
    controller: &ConnectionController,
    stdin: &mut Lines<BufReader<Stdin>>,
    events: &mut broadcast::Receiver<SessionEvent>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            line = stdin.next_line() => match line? {
                Some(line) => {
                    if controller.send(line).is_err() && controller.phase() != Phase::Open {
                        bail!("data channel is no longer open");
                    }
                }
                None => return Ok(()),
            },
            event = events.recv() => {
                if let Ok(SessionEvent::ChannelClosed { .. }) = event {
                    eprintln!("Peer closed the connection");
                    return Ok(());
                }
            }
        }
    }
}

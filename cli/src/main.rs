use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ipr_genesis::{decode_key, GenesisAccount, GenesisConfig, GenesisHost, GenesisPatent};
use ipr_royalties::{CallOutput, DistributionOutcome, HostError, RoyaltyCall, SignedCall};
use ipr_shares::{preview_distribution, validate_share_set, Amount, Share, TokenType, MAX_CONTRIBUTORS};

/// Patent royalty distribution CLI
#[derive(Parser)]
#[command(name = "ipr", version, about = "Patent royalty distribution command-line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new Ed25519 keypair
    Keygen {
        /// Output file for the secret key
        #[arg(short, long, default_value = "ipr.key")]
        output: PathBuf,
    },

    /// Genesis configuration commands
    Genesis {
        #[command(subcommand)]
        command: GenesisCommands,
    },

    /// Share-set commands
    Shares {
        #[command(subcommand)]
        command: SharesCommands,
    },

    /// Payout commands
    Payout {
        #[command(subcommand)]
        command: PayoutCommands,
    },

    /// Set shares and run one distribution against an in-memory host
    Simulate {
        /// Path to the genesis file (.json or .toml)
        #[arg(long)]
        genesis: PathBuf,

        /// Patent id (hex-encoded, 64 characters)
        #[arg(long, value_parser = parse_key)]
        patent_id: [u8; 32],

        /// Amount to distribute
        #[arg(long)]
        amount: Amount,

        /// Share as <contributor-hex>:<percentage>, repeatable
        #[arg(long = "share", value_parser = parse_share, required = true)]
        shares: Vec<Share>,

        /// Pay in this token instead of the native currency
        #[arg(long, value_parser = parse_key)]
        token: Option<[u8; 32]>,
    },
}

#[derive(Subcommand)]
enum GenesisCommands {
    /// Generate a default genesis file
    Init {
        /// Chain ID for the genesis
        #[arg(long)]
        chain_id: String,

        /// Contract owner (hex-encoded public key); defaults to the devnet owner
        #[arg(long, value_parser = parse_key)]
        owner: Option<[u8; 32]>,

        /// Output path; the extension selects JSON or TOML
        #[arg(long, default_value = "genesis.json")]
        output: PathBuf,
    },

    /// Register a patent in an existing genesis file
    AddPatent {
        /// Path to the existing genesis file
        #[arg(long)]
        genesis: PathBuf,

        /// Patent id (hex-encoded, 64 characters)
        #[arg(long, value_parser = parse_key)]
        patent_id: [u8; 32],

        /// Patent owner (hex-encoded public key)
        #[arg(long, value_parser = parse_key)]
        owner: [u8; 32],

        /// Contributor public key, repeatable
        #[arg(long = "contributor", value_parser = parse_key, required = true)]
        contributors: Vec<[u8; 32]>,
    },

    /// Fund a native account in an existing genesis file
    AddAccount {
        /// Path to the existing genesis file
        #[arg(long)]
        genesis: PathBuf,

        /// Account public key (hex-encoded, 64 characters)
        #[arg(long, value_parser = parse_key)]
        pubkey: [u8; 32],

        /// Initial balance
        #[arg(long)]
        balance: Amount,
    },
}

#[derive(Subcommand)]
enum SharesCommands {
    /// Check a share set against the contract rules
    Validate {
        /// Share as <contributor-hex>:<percentage>, repeatable
        #[arg(long = "share", value_parser = parse_share)]
        shares: Vec<Share>,

        /// Contributor limit to check against
        #[arg(long, default_value_t = MAX_CONTRIBUTORS)]
        max_contributors: usize,
    },
}

#[derive(Subcommand)]
enum PayoutCommands {
    /// Show how an amount would be split, without moving funds
    Preview {
        /// Amount to split
        #[arg(long)]
        amount: Amount,

        /// Share as <contributor-hex>:<percentage>, repeatable
        #[arg(long = "share", value_parser = parse_share, required = true)]
        shares: Vec<Share>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { output } => cmd_keygen(output),
        Commands::Genesis { command } => match command {
            GenesisCommands::Init {
                chain_id,
                owner,
                output,
            } => cmd_genesis_init(&chain_id, owner, output),
            GenesisCommands::AddPatent {
                genesis,
                patent_id,
                owner,
                contributors,
            } => cmd_genesis_add_patent(genesis, patent_id, owner, contributors),
            GenesisCommands::AddAccount {
                genesis,
                pubkey,
                balance,
            } => cmd_genesis_add_account(genesis, pubkey, balance),
        },
        Commands::Shares { command } => match command {
            SharesCommands::Validate {
                shares,
                max_contributors,
            } => cmd_shares_validate(shares, max_contributors),
        },
        Commands::Payout { command } => match command {
            PayoutCommands::Preview { amount, shares } => cmd_payout_preview(amount, &shares),
        },
        Commands::Simulate {
            genesis,
            patent_id,
            amount,
            shares,
            token,
        } => cmd_simulate(genesis, patent_id, amount, shares, token),
    }
}

fn parse_key(s: &str) -> Result<[u8; 32], String> {
    decode_key(s)
}

/// Parse `<contributor-hex>:<percentage>`.
fn parse_share(s: &str) -> Result<Share, String> {
    let (key, pct) = s
        .split_once(':')
        .ok_or_else(|| format!("expected <contributor>:<percentage>, got {s:?}"))?;
    let contributor = decode_key(key)?;
    let percentage = pct
        .parse::<u32>()
        .map_err(|e| format!("invalid percentage {pct:?}: {e}"))?;
    Ok(Share::new(contributor, percentage))
}

fn load_genesis(path: &PathBuf) -> GenesisConfig {
    let config = GenesisConfig::from_file(path).unwrap_or_else(|e| {
        eprintln!("Error reading genesis file: {e}");
        std::process::exit(1);
    });
    tracing::debug!(
        path = %path.display(),
        chain_id = %config.chain_id,
        genesis_hash = %hex::encode(config.genesis_hash),
        "genesis loaded"
    );
    config
}

fn save_genesis(config: &mut GenesisConfig, path: &PathBuf) {
    config.genesis_hash = config.compute_genesis_hash();

    config.validate().unwrap_or_else(|e| {
        eprintln!("Genesis validation failed: {e}");
        std::process::exit(1);
    });

    config.to_file(path).unwrap_or_else(|e| {
        eprintln!("Error writing genesis file: {e}");
        std::process::exit(1);
    });
}

fn cmd_keygen(output: PathBuf) {
    let signing_key = SigningKey::generate(&mut OsRng);
    let verifying_key = signing_key.verifying_key();
    let pubkey_hex = hex::encode(verifying_key.as_bytes());
    let secret_hex = hex::encode(signing_key.to_bytes());

    std::fs::write(&output, &secret_hex).unwrap_or_else(|e| {
        eprintln!("Error writing key file: {e}");
        std::process::exit(1);
    });

    println!("Generated new Ed25519 keypair");
    println!("  Public key: {pubkey_hex}");
    println!("  Secret key saved to: {}", output.display());
}

fn cmd_genesis_init(chain_id: &str, owner: Option<[u8; 32]>, output: PathBuf) {
    let mut config = GenesisConfig::default_devnet();
    config.chain_id = chain_id.to_string();
    if let Some(owner) = owner {
        config.owner = owner;
    }

    save_genesis(&mut config, &output);

    println!("Genesis file created: {}", output.display());
    println!("  Chain ID: {}", config.chain_id);
    println!("  Owner: {}", hex::encode(config.owner));
    println!("  Custody: {}", hex::encode(config.params.custody));
    println!("  Accounts: {}", config.accounts.len());
    println!("  Tokens: {}", config.tokens.len());
    println!("  Patents: {}", config.patents.len());
    println!("  Genesis hash: {}", hex::encode(config.genesis_hash));
}

fn cmd_genesis_add_patent(
    genesis_path: PathBuf,
    patent_id: [u8; 32],
    owner: [u8; 32],
    contributors: Vec<[u8; 32]>,
) {
    let mut config = load_genesis(&genesis_path);

    let count = contributors.len();
    config.patents.push(GenesisPatent {
        patent_id,
        owner,
        contributors,
    });

    save_genesis(&mut config, &genesis_path);

    println!("Added patent to genesis");
    println!("  Patent: {}", hex::encode(patent_id));
    println!("  Owner: {}", hex::encode(owner));
    println!("  Contributors: {count}");
    println!("  Total patents: {}", config.patents.len());
    println!("  New genesis hash: {}", hex::encode(config.genesis_hash));
}

fn cmd_genesis_add_account(genesis_path: PathBuf, pubkey: [u8; 32], balance: Amount) {
    let mut config = load_genesis(&genesis_path);

    config.accounts.push(GenesisAccount { pubkey, balance });

    save_genesis(&mut config, &genesis_path);

    println!("Added account to genesis");
    println!("  Pubkey: {}", hex::encode(pubkey));
    println!("  Balance: {balance}");
    println!("  Total accounts: {}", config.accounts.len());
    println!("  New genesis hash: {}", hex::encode(config.genesis_hash));
}

fn cmd_shares_validate(shares: Vec<Share>, max_contributors: usize) {
    let count = shares.len();
    match validate_share_set(shares, max_contributors) {
        Ok(_) => println!("Share set is valid ({count} contributors, total 100%)"),
        Err(e) => {
            eprintln!("Invalid share set: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_payout_preview(amount: Amount, shares: &[Share]) {
    let plan = preview_distribution(amount, shares).unwrap_or_else(|e| {
        eprintln!("Cannot preview payout: {e}");
        std::process::exit(1);
    });

    println!("Payout preview for {amount}");
    for leg in &plan.legs {
        let marker = if leg.payout == 0 { "  (zero leg, would abort)" } else { "" };
        println!(
            "  {} {:>3}% -> {}{marker}",
            hex::encode(leg.contributor),
            leg.percentage,
            leg.payout
        );
    }
    println!("  Paid: {}", plan.total_paid());
    println!("  Residue: {}", plan.remaining);
}

/// Point `patent_id` at `inventor` and fund `payer` with `amount` in the
/// chosen currency, then refresh the genesis hash.
fn seed_simulation(
    config: &mut GenesisConfig,
    patent_id: &[u8; 32],
    amount: Amount,
    token: Option<[u8; 32]>,
    inventor: [u8; 32],
    payer: [u8; 32],
) -> Result<(), String> {
    let patent = config
        .patents
        .iter_mut()
        .find(|p| &p.patent_id == patent_id)
        .ok_or_else(|| format!("patent {} is not in the genesis", hex::encode(patent_id)))?;
    patent.owner = inventor;

    if amount > 0 {
        let holder = GenesisAccount {
            pubkey: payer,
            balance: amount,
        };
        match token {
            None => config.accounts.push(holder),
            Some(id) => {
                if let Some(ledger) = config.tokens.iter_mut().find(|t| t.token_id == id) {
                    ledger.balances.push(holder);
                }
            }
        }
    }

    config.genesis_hash = config.compute_genesis_hash();
    Ok(())
}

/// Submit the share update and the distribution as signed calls.
fn run_simulation(
    host: &GenesisHost,
    inventor: &SigningKey,
    payer: &SigningKey,
    patent_id: [u8; 32],
    amount: Amount,
    shares: Vec<Share>,
    token: Option<[u8; 32]>,
) -> Result<DistributionOutcome, HostError> {
    let submit = |key: &SigningKey, call: RoyaltyCall| {
        let nonce = host.next_nonce(&key.verifying_key().to_bytes());
        host.submit(&SignedCall::new(key, nonce, call)?)
    };

    submit(inventor, RoyaltyCall::SetPatentShares { patent_id, shares })?;
    let output = submit(
        payer,
        RoyaltyCall::DistributeRoyalties {
            patent_id,
            amount,
            token: TokenType::from(token),
        },
    )?;
    match output {
        CallOutput::Distribution(outcome) => Ok(outcome),
        CallOutput::Applied => Err(HostError::Encoding(
            "distribution produced no outcome".to_string(),
        )),
    }
}

fn cmd_simulate(
    genesis_path: PathBuf,
    patent_id: [u8; 32],
    amount: Amount,
    shares: Vec<Share>,
    token: Option<[u8; 32]>,
) {
    let mut config = load_genesis(&genesis_path);

    let inventor = SigningKey::generate(&mut OsRng);
    let payer = SigningKey::generate(&mut OsRng);
    seed_simulation(
        &mut config,
        &patent_id,
        amount,
        token,
        inventor.verifying_key().to_bytes(),
        payer.verifying_key().to_bytes(),
    )
    .unwrap_or_else(|e| {
        eprintln!("Cannot prepare simulation: {e}");
        std::process::exit(1);
    });

    let host = config.into_host().unwrap_or_else(|e| {
        eprintln!("Error bootstrapping host: {e}");
        std::process::exit(1);
    });
    println!(
        "Host ready: {} patents registered",
        host.view(|c| c.directory().patent_count())
    );

    let outcome = run_simulation(&host, &inventor, &payer, patent_id, amount, shares, token)
        .unwrap_or_else(|e| {
            eprintln!("Simulation failed: {e}");
            std::process::exit(1);
        });

    println!("Distribution #{} at height {}", outcome.distribution_id, host.height());
    println!("  Patent: {}", hex::encode(outcome.patent_id));
    println!("  Payer: {}", hex::encode(payer.verifying_key().to_bytes()));
    match outcome.token_type {
        TokenType::Native => println!("  Token: native"),
        TokenType::Token(id) => {
            let holders = host.view_token(&id, |t| t.holder_count()).unwrap_or(0);
            println!("  Token: {} ({holders} holders)", hex::encode(id));
        }
    }
    for leg in &outcome.legs {
        println!(
            "  {} {:>3}% -> {}",
            hex::encode(leg.contributor),
            leg.percentage,
            leg.payout
        );
    }
    println!("  Paid: {}", outcome.total_paid());
    println!("  Residue left in custody: {}", outcome.remaining);

    host.view(|c| {
        let history = c.ledger().history_for_patent(&patent_id);
        println!("  Distributions for this patent: {}", history.len());
        for payout in c.ledger().payouts_for_patent(&patent_id) {
            println!(
                "  Cumulative {} -> {}",
                hex::encode(payout.contributor),
                payout.total_received
            );
        }
    });
    println!("  State root: {}", hex::encode(host.state_root()));
}

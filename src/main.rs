// Entry point for the utxo-chain command-line tool
use clap::Parser;
use data_encoding::HEXLOWER;
use log::{error, LevelFilter};
use serde_json::json;
use std::process;
use utxo_chain::{
    convert_address, decode_address, hash_pub_key, validate_address, Block, Blockchain,
    BlockchainError, Command, Config, KvStore, Ledger, Opt, SledStore, Wallets,
};

fn main() {
    // Info by default; RUST_LOG still overrides it
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn open_store(config: &Config) -> Result<Box<dyn KvStore>, BlockchainError> {
    Ok(Box::new(SledStore::open(&config.data_dir)?))
}

fn check_address(address: &str) -> Result<(), BlockchainError> {
    if validate_address(address) {
        Ok(())
    } else {
        Err(BlockchainError::InvalidAddress(address.to_string()))
    }
}

fn run_command(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(opt.config.as_deref())?;

    match opt.command {
        Command::Createblockchain { address } => {
            let genesis_key_hash = decode_address(&address)?;
            let blockchain =
                Blockchain::create_blockchain(open_store(&config)?, &config, &genesis_key_hash)?;
            blockchain.close()?;
            println!("Done!");
        }
        Command::Createwallet => {
            let mut wallets = Wallets::load(&config.wallet_file, config.address_version)?;
            let address = wallets.create_wallet()?;
            println!("Your new address: {address}")
        }
        Command::GetBalance { address } => {
            let pub_key_hash = decode_address(&address)?;
            let blockchain = Blockchain::open(open_store(&config)?, &config)?;
            let balance = Ledger::new(&blockchain).get_balance(&pub_key_hash)?;
            blockchain.close()?;
            println!("Balance of {address}: {balance}");
        }
        Command::ListAddresses => {
            let wallets = Wallets::load(&config.wallet_file, config.address_version)?;
            for address in wallets.get_addresses() {
                println!("{address}")
            }
        }
        Command::Send { from, to, amount } => {
            check_address(&from)?;
            let to_pub_key_hash = decode_address(&to)?;

            let wallets = Wallets::load(&config.wallet_file, config.address_version)?;
            let wallet = wallets.require_wallet(&from)?;

            let mut blockchain = Blockchain::open(open_store(&config)?, &config)?;
            let transaction =
                Ledger::new(&blockchain).new_utxo_transaction(wallet, &to_pub_key_hash, amount)?;
            blockchain.mine_block(&[transaction])?;
            blockchain.close()?;
            println!("Success!")
        }
        Command::Printchain { json } => {
            let blockchain = Blockchain::open(open_store(&config)?, &config)?;
            for block in blockchain.iterator() {
                let block = block?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&block_view(&block, &config))?);
                } else {
                    print_block(&block, &config);
                }
            }
            blockchain.close()?;
        }
        Command::ValidateChain => {
            let blockchain = Blockchain::open(open_store(&config)?, &config)?;
            let count = blockchain.validate_chain()?;
            blockchain.close()?;
            println!("Chain is valid: {count} block(s) checked");
        }
    }
    Ok(())
}

fn print_block(block: &Block, config: &Config) {
    println!("Pre block hash: {}", HEXLOWER.encode(block.get_pre_block_hash()));
    println!("Cur block hash: {}", block.get_hash_hex());
    println!("Nonce: {}", block.get_nonce());
    println!("Merkle root: {}", HEXLOWER.encode(block.get_merkle_root()));

    for tx in block.get_transactions() {
        println!("- Transaction txid_hex: {}", HEXLOWER.encode(tx.get_id()));
        if !tx.is_coinbase() {
            for input in tx.get_vin() {
                let pub_key_hash = hash_pub_key(input.get_pub_key());
                println!(
                    "-- Input txid = {}, vout = {}, from = {}",
                    HEXLOWER.encode(input.get_txid()),
                    input.get_vout(),
                    convert_address(config.address_version, &pub_key_hash),
                )
            }
        }
        for output in tx.get_vout() {
            println!(
                "-- Output value = {}, to = {}",
                output.get_value(),
                convert_address(config.address_version, output.get_pub_key_hash()),
            )
        }
    }
    println!()
}

fn block_view(block: &Block, config: &Config) -> serde_json::Value {
    let transactions: Vec<serde_json::Value> = block
        .get_transactions()
        .iter()
        .map(|tx| {
            let inputs: Vec<serde_json::Value> = tx
                .get_vin()
                .iter()
                .filter(|_| !tx.is_coinbase())
                .map(|input| {
                    json!({
                        "txid": HEXLOWER.encode(input.get_txid()),
                        "vout": input.get_vout(),
                        "from": convert_address(config.address_version, &hash_pub_key(input.get_pub_key())),
                    })
                })
                .collect();
            let outputs: Vec<serde_json::Value> = tx
                .get_vout()
                .iter()
                .map(|output| {
                    json!({
                        "value": output.get_value(),
                        "to": convert_address(config.address_version, output.get_pub_key_hash()),
                    })
                })
                .collect();
            json!({
                "txid": HEXLOWER.encode(tx.get_id()),
                "coinbase": tx.is_coinbase(),
                "inputs": inputs,
                "outputs": outputs,
            })
        })
        .collect();

    json!({
        "hash": block.get_hash_hex(),
        "pre_block_hash": HEXLOWER.encode(block.get_pre_block_hash()),
        "nonce": block.get_nonce(),
        "merkle_root": HEXLOWER.encode(block.get_merkle_root()),
        "transactions": transactions,
    })
}

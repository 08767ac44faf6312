use clap::Parser;
use tombhash::HashTable;
use tombhash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Remove every n-th key after filling, leaving tombstones behind.
    #[arg(short = 'r', long = "remove_every", default_value_t = 3)]
    remove_every: u64,
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64, u64> = HashTable::with_capacity(args.target_capacity);

    println!(
        "Actual capacity: {} ({} buckets)",
        table.capacity(),
        table.bucket_count()
    );
    println!("Filling table with u64 keys...");

    let mut num_failures = 0;
    let num_values = table.capacity() as u64;
    for key in 0..num_values {
        match table.try_entry(key) {
            Ok(Entry::Vacant(entry)) => {
                entry.insert(key * 2);
                continue;
            }
            Ok(Entry::Occupied(_)) => {
                panic!("Key already exists in table: {}", key);
            }
            Err(_) => {
                num_failures += 1;
            }
        }

        table.insert(key, key * 2);
    }

    println!("Inserted {} keys into table", table.len());
    println!(
        "Final load factor: {:.2}%",
        (table.len() as f64 / table.bucket_count() as f64) * 100.0
    );

    table.print_probe_histogram();
    table.debug_stats().print();

    if args.remove_every > 0 {
        let removed = (0..num_values)
            .step_by(args.remove_every as usize)
            .filter(|key| table.remove(key))
            .count();
        println!("Removed {} keys, leaving tombstones", removed);
        table.debug_stats().print();
    }

    println!(
        "Number of failed try_entry attempts: {} ({:.02}%)",
        num_failures,
        num_failures as f64 / num_values.max(1) as f64 * 100.0
    );
}

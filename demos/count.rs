use std::fs::File;

use clap::Parser;
use memmap2::Mmap;
use simd_csv_tokenizer::ReaderBuilder;

#[derive(Parser, Debug)]
struct Args {
    /// Path to target CSV file
    path: String,

    /// Whether to count using the `csv` crate instead, for comparison
    #[arg(long)]
    csv: bool,

    /// Whether to disable SIMD acceleration
    #[arg(long)]
    scalar: bool,

    /// Whether to memory map the file instead of streaming it
    #[arg(long)]
    mmap: bool,

    /// Whether to also unescape every field
    #[arg(long)]
    unescape: bool,
}

impl Args {
    fn delimiter(&self) -> u8 {
        if self.path.ends_with(".tsv") {
            b'\t'
        } else {
            b','
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let file = File::open(&args.path)?;

    if args.csv {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(args.delimiter())
            .from_reader(file);

        let mut count: u64 = 0;
        let mut record = csv::ByteRecord::new();

        while reader.read_byte_record(&mut record)? {
            count += 1;
        }

        println!("{}", count);

        return Ok(());
    }

    let mut builder = ReaderBuilder::with_capacity(1024 * (1 << 10));
    builder.delimiter(args.delimiter()).simd(!args.scalar);

    let mut count: u64 = 0;
    let mut fields: u64 = 0;

    if args.mmap {
        let map = unsafe { Mmap::map(&file)? };
        let mut reader = builder.from_slice(&map)?;

        eprintln!("kernel: {:?}", reader.simd_kernel());

        while let Some(mut record) = reader.read_record()? {
            count += 1;

            if args.unescape {
                for i in 0..record.len() {
                    record.field(i)?;
                    fields += 1;
                }
            }
        }
    } else {
        let mut reader = builder.from_reader(file)?;

        eprintln!("kernel: {:?}", reader.simd_kernel());

        while let Some(mut record) = reader.read_record()? {
            count += 1;

            if args.unescape {
                for i in 0..record.len() {
                    record.field(i)?;
                    fields += 1;
                }
            }
        }
    }

    if args.unescape {
        eprintln!("fields: {}", fields);
    }

    println!("{}", count);

    Ok(())
}

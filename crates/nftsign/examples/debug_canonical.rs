use nftsign::canonical as nftsign_canonical;
use nftsign::crypto as nftsign_crypto;
use nftsign::model as nftsign_model;

fn main() {
    let path = std::env::args().nth(1).expect("usage: debug_canonical <xml_file>");
    let xml = std::fs::read_to_string(&path).unwrap();
    let documents = nftsign_model::parse_documents(&xml).unwrap();

    for (i, doc) in documents.iter().enumerate() {
        let canonical = nftsign_canonical::canonical_bytes(doc).unwrap();

        eprintln!("=== NFTS #{} ===", i + 1);
        eprintln!("Canonical bytes ({}):", canonical.len());
        eprintln!("{}", String::from_utf8_lossy(&canonical));
        eprintln!("--- END canonical ---");

        let digest = nftsign_crypto::digest::sha1_digest(&canonical);
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        eprintln!("SHA-1: {hex}");

        match &doc.signature {
            Some(sig) => eprintln!("Embedded signature: {} bytes", sig.len()),
            None => eprintln!("Embedded signature: none"),
        }
    }
}

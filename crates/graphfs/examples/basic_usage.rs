//! Basic usage of graphfs
//!
//! Builds a small tree, links two vertices, attaches a template and walks
//! the result through the filesystem call surface.

use graphfs::{Config, FsContext, GraphError, GraphFs, GraphStore, LogSink};
use std::sync::Arc;

fn main() -> graphfs::Result<()> {
    let backend = Arc::new(GraphStore::in_memory()?);
    let ctx = FsContext::new(Config::default(), backend).with_events(Arc::new(LogSink));
    let fs = GraphFs::new(ctx);

    println!("Creating folders and files");
    fs.create_folder(&fs.resolve("/people")?)?;
    fs.create_file(&fs.resolve("/people/ana")?, b"")?;
    fs.create_file(&fs.resolve("/people/card")?, b"")?;

    let card = fs
        .resolve("/people/card")?
        .node
        .ok_or_else(|| GraphError::not_found("/people/card"))?
        .to_id(false);
    println!("card is addressable as /.V/{card}");

    // ana -[subject]-> card; the card renders its inbound subjects
    fs.create_link(&fs.resolve(&format!("/.V/{card}/IN/subject"))?, &fs.resolve("/people/ana")?)?;
    fs.set_property(&fs.resolve("/people/card")?, "template", "Card for{{#subject}} {{name}}{{/subject}}")?;

    let content = fs.read_file(&fs.resolve("/people/card")?, None, 0)?;
    println!("/people/card: {}", String::from_utf8_lossy(&content));

    println!("/people lists {:?}", fs.read_folder(&fs.resolve("/people")?)?);
    println!("card edges in: {:?}", fs.read_folder(&fs.resolve(&format!("/.V/{card}/IN"))?)?);
    println!(
        "subject points at {}",
        fs.read_link(&fs.resolve(&format!("/.V/{card}/IN/subject"))?)?
    );

    let stat = fs.stat(&fs.resolve("/people/card")?)?;
    println!("card is a {} of {} bytes, mode {:o}", stat.kind, stat.size, stat.mode);
    Ok(())
}

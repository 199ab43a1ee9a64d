use std::env;
use std::panic;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use pdfium_render::prelude::*;

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let mut args = env::args().skip(1);
    let filename = match args.next() {
        Some(filename) => filename,
        None => {
            eprintln!("Usage: inspect-form <filename>");
            std::process::exit(1);
        }
    };

    let templates_dir = env::var("TEMPLATES_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("templates"));
    let path = templates_dir.join(&filename);
    if !path.is_file() {
        eprintln!(
            "template '{filename}' not found in {}",
            templates_dir.display()
        );
        std::process::exit(1);
    }

    let pdfium = panic::catch_unwind(Pdfium::default)
        .map_err(|_| anyhow!("failed to initialize PDFium"))?;
    let document = pdfium
        .load_pdf_from_file(&path, None)
        .with_context(|| format!("failed to load {}", path.display()))?;

    if document.form().is_none() {
        println!("{filename}: no interactive form");
        return Ok(());
    }

    let mut count = 0usize;
    for page in document.pages().iter() {
        for annotation in page.annotations().iter() {
            if let Some(field) = annotation.as_form_field() {
                count += 1;
                let name = field
                    .name()
                    .unwrap_or_else(|| "<unnamed>".to_string());
                let (kind, value) = describe_field(field);
                println!("{kind:<12} {name:<48} {value}");
            }
        }
    }

    println!("{count} form field(s) in {filename}");
    Ok(())
}

fn describe_field(field: &PdfFormField) -> (&'static str, String) {
    if let Some(text) = field.as_text_field() {
        ("text", text.value().unwrap_or_default())
    } else if let Some(checkbox) = field.as_checkbox_field() {
        ("checkbox", checkbox.is_checked().unwrap_or(false).to_string())
    } else if let Some(radio) = field.as_radio_button_field() {
        ("radio", radio.is_checked().unwrap_or(false).to_string())
    } else if field.as_combo_box_field().is_some() {
        ("combo", String::new())
    } else if field.as_list_box_field().is_some() {
        ("list", String::new())
    } else if field.as_push_button_field().is_some() {
        ("button", String::new())
    } else if field.as_signature_field().is_some() {
        ("signature", String::new())
    } else {
        ("unknown", String::new())
    }
}

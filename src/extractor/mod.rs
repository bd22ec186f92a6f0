
use anyhow::{Context, Result, anyhow, bail};
use std::io::Read;
use tracing::debug;

/// Decompressed-size cap for the DOCX body, so a crafted archive cannot
/// balloon in memory.
const MAX_DOCX_XML_BYTES: u64 = 50 * 1024 * 1024;

/// Extract plain text from an uploaded file, dispatching on the (lowercased)
/// file name. Returns `None` for unsupported types; the returned text is
/// trimmed, and an empty result means the file carried no usable content.
#[inline]
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<Option<String>> {
    let lowered = filename.to_lowercase();

    let text = if lowered.ends_with(".pdf") {
        extract_pdf(bytes)?
    } else if lowered.ends_with(".docx") {
        extract_docx(bytes)?
    } else if lowered.ends_with(".txt") {
        String::from_utf8(bytes.to_vec()).context("text file is not valid UTF-8")?
    } else {
        debug!("Unsupported upload type: {}", filename);
        return Ok(None);
    };

    Ok(Some(text.trim().to_string()))
}

fn extract_pdf(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| anyhow!("PDF extraction failed: {}", e))
}

/// Pull the visible text runs (`w:t`) out of the DOCX body, one line per
/// paragraph (`w:p`).
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .context("DOCX is not a readable archive")?;

    let mut document_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .context("DOCX has no word/document.xml")?;
        entry
            .take(MAX_DOCX_XML_BYTES)
            .read_to_end(&mut document_xml)
            .context("failed to read DOCX body")?;
        if document_xml.len() as u64 >= MAX_DOCX_XML_BYTES {
            bail!("DOCX body exceeds the size limit");
        }
    }

    let mut reader = quick_xml::Reader::from_reader(document_xml.as_slice());
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader
            .read_event_into(&mut buf)
            .context("malformed DOCX body")?
        {
            quick_xml::events::Event::Start(e) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_run = true;
                }
            }
            quick_xml::events::Event::Text(e) if in_text_run => {
                out.push_str(e.unescape().unwrap_or_default().as_ref());
            }
            quick_xml::events::Event::End(e) => {
                let name = e.local_name();
                if name.as_ref() == b"t" {
                    in_text_run = false;
                } else if name.as_ref() == b"p" {
                    out.push('\n');
                }
            }
            quick_xml::events::Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(out)
}

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::handle::FoundSubdomain;
use crate::input::OutputFormat;

/// 结果接收方
///
/// 扫描引擎在每个域名扫描完成后调用一次 `write_domain`, 全部域名结束后调用 `finish`。
pub trait ResultSink {
    fn write_domain(&mut self, domain: &str, rows: &[FoundSubdomain]) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// 保存在内存中的结果
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<FoundSubdomain>,
    /// 每次写入的域名和行数
    pub batches: Vec<(String, usize)>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn write_domain(&mut self, domain: &str, rows: &[FoundSubdomain]) -> Result<()> {
        self.batches.push((domain.to_string(), rows.len()));
        self.rows.extend_from_slice(rows);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

/// 完整的导出数据结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportData {
    pub export_time: String,
    pub total: usize,
    pub results: Vec<FoundSubdomain>,
}

/// 写入文件的结果接收方
///
/// CSV和TXT格式每个域名结束后立即写入并刷新, JSON和XML需要完整文档, 在 `finish` 时写入。
pub struct FileSink {
    writer: BufWriter<File>,
    format: OutputFormat,
    path: PathBuf,
    pending: Vec<FoundSubdomain>,
}

impl FileSink {
    pub fn create<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = BufWriter::new(File::create(&path)?);

        match format {
            OutputFormat::Csv => writeln!(writer, "Subdomain,Title,Domain")?,
            OutputFormat::Txt => {
                writeln!(writer, "{:<40} {:<40} {}", "子域名", "标题", "根域名")?;
                writeln!(writer, "{}", "-".repeat(100))?;
            }
            OutputFormat::Json | OutputFormat::Xml => {}
        }
        writer.flush()?;

        Ok(FileSink {
            writer,
            format,
            path,
            pending: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for FileSink {
    fn write_domain(&mut self, _domain: &str, rows: &[FoundSubdomain]) -> Result<()> {
        match self.format {
            OutputFormat::Csv => {
                for row in rows {
                    writeln!(
                        self.writer,
                        "{},{},{}",
                        escape_csv(&row.subdomain),
                        escape_csv(&row.title),
                        escape_csv(&row.domain)
                    )?;
                }
            }
            OutputFormat::Txt => {
                for row in rows {
                    writeln!(self.writer, "{:<40} {:<40} {}", row.subdomain, row.title, row.domain)?;
                }
            }
            OutputFormat::Json | OutputFormat::Xml => {
                self.pending.extend_from_slice(rows);
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let export_data = ExportData {
            export_time: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            total: self.pending.len(),
            results: std::mem::take(&mut self.pending),
        };

        match self.format {
            OutputFormat::Json => {
                let json_data = serde_json::to_string_pretty(&export_data)?;
                self.writer.write_all(json_data.as_bytes())?;
            }
            OutputFormat::Xml => {
                self.writer.write_all(export_to_xml(&export_data).as_bytes())?;
            }
            OutputFormat::Csv | OutputFormat::Txt => {}
        }
        self.writer.flush()?;

        info!("结果已导出到: {}", self.path.display());
        Ok(())
    }
}

/// 一次性导出结果到文件
pub fn export_results(
    results: &[FoundSubdomain],
    output_path: &str,
    format: OutputFormat,
) -> Result<()> {
    let mut sink = FileSink::create(output_path, format)?;
    sink.write_domain("", results)?;
    sink.finish()
}

/// 导出为XML格式
fn export_to_xml(data: &ExportData) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str("<rsubscan_results>\n");
    xml.push_str(&format!("  <export_time>{}</export_time>\n", data.export_time));
    xml.push_str(&format!("  <total>{}</total>\n", data.total));
    for row in &data.results {
        xml.push_str("  <result>\n");
        xml.push_str(&format!("    <subdomain>{}</subdomain>\n", escape_xml(&row.subdomain)));
        xml.push_str(&format!("    <title>{}</title>\n", escape_xml(&row.title)));
        xml.push_str(&format!("    <domain>{}</domain>\n", escape_xml(&row.domain)));
        xml.push_str("  </result>\n");
    }
    xml.push_str("</rsubscan_results>\n");
    xml
}

/// XML转义
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// CSV转义
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

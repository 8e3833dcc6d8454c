//! Thread-safe parser pool for tree-sitter parsers.
//!
//! Tree-sitter parsers are not `Send + Sync`, so parsing happens on
//! dedicated worker threads; callers hand off a `ParseRequest` over a
//! channel and block (or `.await` via `spawn_blocking`) for the `ParseResult`.

use anyhow::Result;
use std::path::PathBuf;
use tree_sitter::{Language as TsLanguage, Parser};

#[derive(Debug, Clone, Copy)]
pub enum FileType {
    Python,
    C,
}

impl FileType {
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match ext {
            "py" => Some(FileType::Python),
            "c" | "h" | "cpp" | "hpp" | "cc" | "cxx" | "hxx" => Some(FileType::C),
            _ => None,
        }
    }

    pub fn get_language(&self) -> TsLanguage {
        match self {
            FileType::Python => tree_sitter_python::LANGUAGE.into(),
            FileType::C => tree_sitter_c::LANGUAGE.into(),
        }
    }
}

#[derive(Debug)]
pub struct ParseRequest {
    pub file_type: FileType,
    pub content: String,
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub path: PathBuf,
    pub content: String,
}

#[derive(Debug)]
struct WorkerRequest {
    request: ParseRequest,
    response_sender: std::sync::mpsc::Sender<Result<ParseResult>>,
}

pub struct ParserPool {
    sender: std::sync::mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerRequest>();
        let receiver = std::sync::Arc::new(std::sync::Mutex::new(receiver));

        for i in 0..num_workers {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    fn worker_thread(
        worker_id: usize,
        receiver: std::sync::Arc<std::sync::Mutex<std::sync::mpsc::Receiver<WorkerRequest>>>,
    ) {
        tracing::debug!("parser worker {} started", worker_id);
        let mut parser = Parser::new();

        loop {
            let request = match receiver.lock().unwrap().recv() {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!("parser worker {} shutting down", worker_id);
                    break;
                }
            };

            let WorkerRequest {
                request,
                response_sender,
            } = request;

            let language = request.file_type.get_language();
            if let Err(e) = parser.set_language(&language) {
                let _ = response_sender.send(Err(anyhow::anyhow!("failed to set language: {e}")));
                continue;
            }

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(ParseResult {
                    tree,
                    path: request.path,
                    content: request.content,
                }),
                None => Err(anyhow::anyhow!("failed to parse content")),
            };

            if response_sender.send(result).is_err() {
                tracing::warn!("failed to send parse result back to caller");
            }
        }
    }

    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = std::sync::mpsc::channel();
        let worker_request = WorkerRequest {
            request,
            response_sender,
        };

        self.sender
            .send(worker_request)
            .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;

        response_receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("parser worker died"))?
    }

    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResult> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let (response_sender, response_receiver) = std::sync::mpsc::channel();
            let worker_request = WorkerRequest {
                request,
                response_sender,
            };

            sender
                .send(worker_request)
                .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;

            response_receiver
                .recv()
                .map_err(|_| anyhow::anyhow!("parser worker died"))?
        })
        .await
        .map_err(|e| anyhow::anyhow!("task join error: {e}"))?
    }
}

impl Clone for ParserPool {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

pub fn create_parser_pool() -> ParserPool {
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);
    ParserPool::new(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_python_source() {
        let pool = create_parser_pool();
        let request = ParseRequest {
            file_type: FileType::Python,
            content: "def greet(name):\n    return name\n".to_string(),
            path: PathBuf::from("test.py"),
        };

        let result = pool.parse(request).await.unwrap();
        assert_eq!(result.tree.root_node().kind(), "module");
    }

    #[tokio::test]
    async fn parses_c_source() {
        let pool = create_parser_pool();
        let request = ParseRequest {
            file_type: FileType::C,
            content: "int add(int a, int b) { return a + b; }\n".to_string(),
            path: PathBuf::from("test.c"),
        };

        let result = pool.parse(request).await.unwrap();
        assert_eq!(result.tree.root_node().kind(), "translation_unit");
    }
}

//! Context assembly and answer generation.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::{RetrievalResult, or_unknown};
use crate::generation::{GenerationRequest, TextGenerator};

/// Returned when retrieval found nothing; the generator is not called.
pub const NO_INFORMATION_RESPONSE: &str = "Üzgünüm, bu konu hakkında bilgim bulunmuyor. Lütfen farklı bir soru sorun veya sorunuzu daha spesifik hale getirin.";

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Turns retrieved chunks into a prompt and asks the generator for an answer.
///
/// Generation failures never escape: they become a user-facing message.
#[derive(Clone)]
pub struct AnswerAssembler {
    generator: Arc<dyn TextGenerator>,
}

impl AnswerAssembler {
    /// Create an assembler around `generator`.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Format the results as numbered, cited context blocks.
    ///
    /// Each block reads `Kaynak i (<donem>[, <yil>] - <kaynak>):` followed by
    /// the chunk text on the next line.
    pub fn build_context(results: &[RetrievalResult]) -> String {
        results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                let meta = &result.chunk.metadata;
                let mut header = format!("Kaynak {} ({}", i + 1, or_unknown(&meta.era));
                if let Some(year) = meta.known_year() {
                    header.push_str(&format!(", {year}"));
                }
                format!(
                    "{header} - {}):\n{}",
                    or_unknown(&meta.source_citation),
                    result.chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Embed the question and context into the instruction template.
    pub fn build_prompt(question: &str, context: &str) -> String {
        format!(
            "Sen Türk Tarihi konusunda uzmanlaşmış bir yapay zeka asistanısın. Görevin, sana verilen \
BİLGİ BANKASI'ndaki tarihsel verileri kullanarak kullanıcının KULLANICI SORUSU'na akademik, net ve \
öğretici bir yanıt vermektir.

BİLGİ BANKASI:
{context}

KULLANICI SORUSU:
{question}

YANIT KURALLARI:
1. Sadece verilen bilgi bankasındaki bilgileri kullan
2. Türkçe, akademik ama anlaşılır bir dil kullan
3. Tarihsel olayları kronolojik sırada ve bağlamıyla anlat
4. Tarihleri, isimleri ve yerleri net olarak belirt
5. Kaynak referanslarını belirt (Türk Tarih Kurumu, TDK vb.)
6. Bilgi bankasında yoksa, \"Bu konuda şu an elimde detaylı bilgi yok\" de
7. Emoji kullanma, ciddi ve akademik ol
8. Karmaşık olayları basit ve anlaşılır şekilde açıkla
9. Önemli tarihleri ve isimleri vurgula

YANIT:
"
        )
    }

    /// Answer `question` from `results`.
    ///
    /// Empty `results` yield [`NO_INFORMATION_RESPONSE`] without calling the
    /// generator. A generator error yields `Yanıt üretilirken bir hata
    /// oluştu: <error>`.
    pub async fn assemble_and_generate(&self, question: &str, results: &[RetrievalResult]) -> String {
        if results.is_empty() {
            return NO_INFORMATION_RESPONSE.to_string();
        }

        let context = Self::build_context(results);
        let request = GenerationRequest {
            question: question.to_string(),
            prompt: Self::build_prompt(question, &context),
            context,
        };

        debug!(generator = self.generator.name(), sources = results.len(), "generating answer");
        match self.generator.generate(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(generator = self.generator.name(), error = %e, "answer generation failed");
                format!("Yanıt üretilirken bir hata oluştu: {e}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::document::{Chunk, ChunkMetadata};
    use crate::error::{RagError, Result};

    #[derive(Default)]
    struct CountingGenerator {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RagError::GenerationError {
                    provider: "test".into(),
                    message: "kota aşıldı".into(),
                });
            }
            Ok(format!("yanıt: {}", request.question))
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn result(era: &str, year: i32, source: &str, content: &str) -> RetrievalResult {
        let metadata = ChunkMetadata {
            era: era.into(),
            year,
            source_citation: source.into(),
            ..ChunkMetadata::default()
        };
        RetrievalResult::semantic(0, Chunk { content: content.into(), metadata }, 0.9)
    }

    #[test]
    fn context_blocks_cite_era_year_and_source() {
        let context = AnswerAssembler::build_context(&[
            result("Osmanlı Devleti", 1453, "TTK", "İstanbul fethedildi."),
            result("", 0, "", "Tarihsiz kayıt."),
        ]);
        assert_eq!(
            context,
            "Kaynak 1 (Osmanlı Devleti, 1453 - TTK):\nİstanbul fethedildi.\n\n---\n\nKaynak 2 (Bilinmiyor - Bilinmiyor):\nTarihsiz kayıt."
        );
    }

    #[test]
    fn prompt_contains_question_and_context() {
        let prompt = AnswerAssembler::build_prompt("Soru?", "BAĞLAM");
        assert!(prompt.contains("BİLGİ BANKASI:\nBAĞLAM\n"));
        assert!(prompt.contains("KULLANICI SORUSU:\nSoru?\n"));
        assert!(prompt.trim_end().ends_with("YANIT:"));
    }

    #[tokio::test]
    async fn empty_results_skip_the_generator() {
        let generator = Arc::new(CountingGenerator::default());
        let assembler = AnswerAssembler::new(generator.clone());
        let answer = assembler.assemble_and_generate("Soru?", &[]).await;
        assert_eq!(answer, NO_INFORMATION_RESPONSE);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_failure_becomes_message() {
        let generator = Arc::new(CountingGenerator { fail: true, ..Default::default() });
        let assembler = AnswerAssembler::new(generator.clone());
        let answer = assembler
            .assemble_and_generate("Soru?", &[result("Cumhuriyet", 1923, "TTK", "İlan")])
            .await;
        assert!(answer.starts_with("Yanıt üretilirken bir hata oluştu: "));
        assert!(answer.contains("kota aşıldı"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Args;
use serde_json::json;

use crate::infra::{
    EventService, InMemoryAttachmentStorage, InMemoryEventRepository, SimulatedGovernmentChannel,
};
use domestica::error::AppError;
use domestica::esocial::{
    AttachmentPolicy, EsocialEventService, EventServiceError, GovernmentOutcome, NovoAnexo,
    NovoEvento, SubmissionPolicy,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Simulate this many transient transport failures before the channel
    /// acknowledges, to exercise the retry path.
    #[arg(long, default_value_t = 0)]
    pub(crate) falhas_transporte: u32,
    /// Attach this file to the demo event (defaults to an embedded sample).
    #[arg(long)]
    pub(crate) anexo: Option<PathBuf>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("eSocial event lifecycle demo");

    let service: Arc<EventService> = Arc::new(EsocialEventService::new(
        Arc::new(InMemoryEventRepository::default()),
        Arc::new(SimulatedGovernmentChannel::novo(args.falhas_transporte)),
        Arc::new(InMemoryAttachmentStorage::default()),
        SubmissionPolicy {
            max_tentativas: args.falhas_transporte + 1,
            timeout: Duration::from_millis(500),
            backoff_base: Duration::from_millis(10),
        },
        AttachmentPolicy::default(),
    ));

    println!("\n1. Validation refuses a benefit whose end date precedes the start");
    let invalido = NovoEvento {
        tipo: "S1207".to_string(),
        data_evento: Local::now().date_naive(),
        payload: json!({
            "cpf": "45678912300",
            "dataInicioBeneficio": "2024-03-01",
            "tipoBeneficio": "AUXILIO_DOENCA",
            "valorBeneficio": 1000,
            "dataFimBeneficio": "2024-02-01"
        }),
    };
    match service.criar_evento(invalido) {
        Err(EventServiceError::Validation(erros)) => {
            for erro in erros {
                println!("  - {erro}");
            }
        }
        outro => println!("  unexpected outcome: {outro:?}"),
    }

    println!("\n2. A dismissal (S-2299) is accepted and born PENDENTE");
    let evento = match service.criar_evento(NovoEvento {
        tipo: "S2299".to_string(),
        data_evento: Local::now().date_naive(),
        payload: json!({
            "cpf": "12345678900",
            "dataDesligamento": "2024-06-01",
            "motivoDesligamento": "PEDIDO_DEMISSAO"
        }),
    }) {
        Ok(evento) => evento,
        Err(err) => {
            println!("  creation rejected: {err}");
            return Ok(());
        }
    };
    println!("  - evento {} -> status {}", evento.id, evento.status);

    let (nome, tipo, conteudo) = carregar_anexo(args.anexo)?;
    match service.adicionar_anexo(
        &evento.id,
        NovoAnexo {
            nome: nome.clone(),
            tipo,
            conteudo,
        },
    ) {
        Ok(anexo) => println!("  - anexo '{}' ({} bytes) em {}", anexo.nome, anexo.tamanho, anexo.url),
        Err(err) => println!("  - anexo '{nome}' recusado: {err}"),
    }

    println!("\n3. Submission (with retry when the channel wobbles)");
    match service.enviar_evento(&evento.id).await {
        Ok(enviado) => println!(
            "  - status {} | tentativa {} | envelope {} bytes",
            enviado.status,
            enviado.tentativas_envio,
            enviado.xml_payload.map(|xml| xml.len()).unwrap_or(0)
        ),
        Err(err) => {
            println!("  - submission failed: {err}");
            return Ok(());
        }
    }

    println!("\n4. The government rejects; the employer corrects and resubmits");
    match service.receber_retorno(
        &evento.id,
        GovernmentOutcome::Rejected,
        Some("CPF inválido".to_string()),
    ) {
        Ok(rejeitado) => println!(
            "  - status {} | mensagem: {}",
            rejeitado.status,
            rejeitado.mensagem_retorno.as_deref().unwrap_or("-")
        ),
        Err(err) => println!("  - callback refused: {err}"),
    }

    match service.corrigir_evento(&evento.id) {
        Ok(corrigido) => println!("  - status {} (trilha de envio limpa)", corrigido.status),
        Err(err) => println!("  - correction refused: {err}"),
    }

    match service.enviar_evento(&evento.id).await {
        Ok(reenviado) => println!("  - reenviado, tentativa {}", reenviado.tentativas_envio),
        Err(err) => println!("  - resubmission failed: {err}"),
    }
    match service.receber_retorno(&evento.id, GovernmentOutcome::Accepted, None) {
        Ok(processado) => println!("  - status final {}", processado.status),
        Err(err) => println!("  - callback refused: {err}"),
    }

    println!("\n5. PROCESSADO is immutable");
    match service.excluir_evento(&evento.id) {
        Err(err) => println!("  - exclusão recusada: {err}"),
        Ok(()) => println!("  - unexpected: deletion went through"),
    }

    Ok(())
}

fn carregar_anexo(caminho: Option<PathBuf>) -> Result<(String, String, Vec<u8>), AppError> {
    match caminho {
        Some(caminho) => {
            let conteudo = std::fs::read(&caminho)?;
            let tipo = mime_guess::from_path(&caminho)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            let nome = caminho
                .file_name()
                .map(|nome| nome.to_string_lossy().into_owned())
                .unwrap_or_else(|| "anexo".to_string());
            Ok((nome, tipo, conteudo))
        }
        None => Ok((
            "recibo-demo.pdf".to_string(),
            mime_guess::from_path("recibo-demo.pdf")
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            b"%PDF-1.4 demo".to_vec(),
        )),
    }
}

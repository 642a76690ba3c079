//! Envelope serialization for the government channel.
//!
//! The layout mirrors what the legacy generators produced: one `evento`
//! element carrying the code and reference date, with the payload fields
//! written as nested elements in declaration order.

use std::fmt::Write as _;

use serde_json::Value;

use super::domain::EsocialEvent;

pub fn gerar_envelope(evento: &EsocialEvent) -> String {
    let mut xml = String::new();
    let _ = write!(
        xml,
        "<eSocial versao=\"1.0\"><evento id=\"{}\" tipo=\"{}\" dataEvento=\"{}\">",
        evento.id,
        evento.tipo.codigo(),
        evento.data_evento.format("%Y-%m-%d"),
    );
    if let Ok(valor) = serde_json::to_value(&evento.payload) {
        escrever_elemento(&mut xml, "payload", &valor);
    }
    xml.push_str("</evento></eSocial>");
    xml
}

fn escrever_elemento(xml: &mut String, nome: &str, valor: &Value) {
    match valor {
        Value::Null => {}
        Value::Bool(b) => escrever_folha(xml, nome, if *b { "true" } else { "false" }),
        Value::Number(n) => escrever_folha(xml, nome, &n.to_string()),
        Value::String(s) => escrever_folha(xml, nome, s),
        Value::Array(itens) => {
            for item in itens {
                escrever_elemento(xml, nome, item);
            }
        }
        Value::Object(campos) => {
            let _ = write!(xml, "<{nome}>");
            for (campo, item) in campos {
                escrever_elemento(xml, campo, item);
            }
            let _ = write!(xml, "</{nome}>");
        }
    }
}

fn escrever_folha(xml: &mut String, nome: &str, texto: &str) {
    let _ = write!(xml, "<{nome}>{}</{nome}>", escapar(texto));
}

fn escapar(texto: &str) -> String {
    let mut saida = String::with_capacity(texto.len());
    for c in texto.chars() {
        match c {
            '&' => saida.push_str("&amp;"),
            '<' => saida.push_str("&lt;"),
            '>' => saida.push_str("&gt;"),
            '"' => saida.push_str("&quot;"),
            '\'' => saida.push_str("&apos;"),
            _ => saida.push(c),
        }
    }
    saida
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::esocial::domain::EventType;
    use crate::esocial::payload::{DesligamentoPayload, EventPayload};
    use chrono::NaiveDate;

    #[test]
    fn envelope_carrega_tipo_e_campos_do_payload() {
        let evento = EsocialEvent::novo(
            EventType::S2299,
            NaiveDate::from_ymd_opt(2024, 6, 1).expect("data válida"),
            EventPayload::Desligamento(DesligamentoPayload {
                cpf: "12345678900".to_string(),
                data_desligamento: NaiveDate::from_ymd_opt(2024, 6, 1).expect("data válida"),
                motivo_desligamento: "PEDIDO_DEMISSAO".to_string(),
                observacao: Some("pediu <conta>".to_string()),
            }),
        );

        let xml = gerar_envelope(&evento);
        assert!(xml.contains("tipo=\"S2299\""));
        assert!(xml.contains("<cpf>12345678900</cpf>"));
        assert!(xml.contains("<observacao>pediu &lt;conta&gt;</observacao>"));
        assert!(xml.ends_with("</evento></eSocial>"));
    }

    #[test]
    fn escapar_cobre_entidades_reservadas() {
        assert_eq!(escapar("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
    }
}

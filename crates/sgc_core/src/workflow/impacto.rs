//! Impact analysis between a unit's vigente map and its working map.
//!
//! # Responsibility
//! - Classify activities as inserted or removed, keyed by description.
//! - Derive which competencies are affected by those changes.
//!
//! # Invariants
//! - Pure function of its inputs; every output list is sorted and
//!   deduplicated, so the result does not depend on storage order.
//! - Activities sharing a description merge their knowledge and competencies.
//! - A renamed activity shows up as one removal plus one insertion.
//! - Missing vigente map yields `ImpactoMapa::default()`.

use crate::model::mapa::{Atividade, MapaConteudo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipoImpacto {
    Inserida,
    Removida,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtividadeImpactada {
    pub descricao: String,
    pub tipo_impacto: TipoImpacto,
    /// Knowledge descriptions of the activity on the side it exists.
    pub conhecimentos: Vec<String>,
    /// Competencies linked to the activity on the side it exists.
    pub competencias_vinculadas: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetenciaImpactada {
    pub descricao: String,
    /// Lines such as `Atividade removida: X`.
    pub atividades_afetadas: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactoMapa {
    pub tem_impactos: bool,
    pub atividades_inseridas: Vec<AtividadeImpactada>,
    pub atividades_removidas: Vec<AtividadeImpactada>,
    pub total_atividades_alteradas: usize,
    pub competencias_impactadas: Vec<CompetenciaImpactada>,
}

/// Compares `atual` against the vigente map.
pub fn analisar(vigente: Option<&MapaConteudo>, atual: &MapaConteudo) -> ImpactoMapa {
    let Some(vigente) = vigente else {
        return ImpactoMapa::default();
    };

    let base = por_descricao(vigente);
    let trabalho = por_descricao(atual);
    let mut impactadas: BTreeMap<String, Vec<String>> = BTreeMap::new();

    let removidas: Vec<AtividadeImpactada> = base
        .iter()
        .filter(|(descricao, _)| !trabalho.contains_key(*descricao))
        .map(|(descricao, atividades)| {
            impactar(vigente, descricao, atividades, TipoImpacto::Removida, &mut impactadas)
        })
        .collect();
    let inseridas: Vec<AtividadeImpactada> = trabalho
        .iter()
        .filter(|(descricao, _)| !base.contains_key(*descricao))
        .map(|(descricao, atividades)| {
            impactar(atual, descricao, atividades, TipoImpacto::Inserida, &mut impactadas)
        })
        .collect();

    ImpactoMapa {
        tem_impactos: !inseridas.is_empty() || !removidas.is_empty(),
        total_atividades_alteradas: inseridas.len() + removidas.len(),
        atividades_inseridas: inseridas,
        atividades_removidas: removidas,
        competencias_impactadas: impactadas
            .into_iter()
            .map(|(descricao, atividades_afetadas)| CompetenciaImpactada {
                descricao,
                atividades_afetadas,
            })
            .collect(),
    }
}

/// Activities sharing a description are reported as one entry.
fn por_descricao(conteudo: &MapaConteudo) -> BTreeMap<&str, Vec<&Atividade>> {
    let mut indice: BTreeMap<&str, Vec<&Atividade>> = BTreeMap::new();
    for atividade in &conteudo.atividades {
        indice.entry(atividade.descricao.as_str()).or_default().push(atividade);
    }
    indice
}

fn impactar(
    conteudo: &MapaConteudo,
    descricao: &str,
    atividades: &[&Atividade],
    tipo_impacto: TipoImpacto,
    impactadas: &mut BTreeMap<String, Vec<String>>,
) -> AtividadeImpactada {
    let linha = match tipo_impacto {
        TipoImpacto::Inserida => format!("Atividade inserida: {descricao}"),
        TipoImpacto::Removida => format!("Atividade removida: {descricao}"),
    };

    let mut competencias_vinculadas: Vec<String> = atividades
        .iter()
        .flat_map(|atividade| conteudo.competencias_de(atividade.id))
        .map(|competencia| competencia.descricao.clone())
        .collect();
    competencias_vinculadas.sort();
    competencias_vinculadas.dedup();

    let mut conhecimentos: Vec<String> = atividades
        .iter()
        .flat_map(|atividade| &atividade.conhecimentos)
        .map(|conhecimento| conhecimento.descricao.clone())
        .collect();
    conhecimentos.sort();
    conhecimentos.dedup();

    for competencia in &competencias_vinculadas {
        let linhas = impactadas.entry(competencia.clone()).or_default();
        if !linhas.contains(&linha) {
            linhas.push(linha.clone());
        }
    }

    AtividadeImpactada {
        descricao: descricao.to_string(),
        tipo_impacto,
        conhecimentos,
        competencias_vinculadas,
    }
}

#[cfg(test)]
mod tests {
    use super::{analisar, ImpactoMapa, TipoImpacto};
    use crate::model::mapa::{Atividade, Competencia, Conhecimento, MapaConteudo};
    use uuid::Uuid;

    fn mapa(atividades: &[&str], competencias: &[(&str, &[&str])]) -> MapaConteudo {
        let mapa_id = Uuid::new_v4();
        let atividades: Vec<Atividade> = atividades
            .iter()
            .map(|descricao| Atividade {
                id: Uuid::new_v4(),
                mapa_id,
                descricao: descricao.to_string(),
                conhecimentos: Vec::new(),
            })
            .collect();
        let competencias = competencias
            .iter()
            .map(|(descricao, vinculos)| Competencia {
                id: Uuid::new_v4(),
                mapa_id,
                descricao: descricao.to_string(),
                atividades: atividades
                    .iter()
                    .filter(|a| vinculos.contains(&a.descricao.as_str()))
                    .map(|a| a.id)
                    .collect(),
            })
            .collect();
        MapaConteudo {
            atividades,
            competencias,
        }
    }

    fn com_conhecimentos(mut conteudo: MapaConteudo, indice: usize, itens: &[&str]) -> MapaConteudo {
        let atividade = &mut conteudo.atividades[indice];
        atividade.conhecimentos = itens
            .iter()
            .map(|descricao| Conhecimento {
                id: Uuid::new_v4(),
                atividade_id: atividade.id,
                descricao: descricao.to_string(),
            })
            .collect();
        conteudo
    }

    #[test]
    fn missing_vigente_map_has_no_impact() {
        let atual = mapa(&["A"], &[]);
        assert_eq!(analisar(None, &atual), ImpactoMapa::default());
    }

    #[test]
    fn renamed_activity_is_a_removal_and_an_insertion() {
        let vigente = mapa(&["Analisar", "Arquivar"], &[("Gestao", &["Analisar", "Arquivar"])]);
        let atual = mapa(&["Analisar contratos", "Arquivar"], &[("Gestao", &["Analisar contratos"])]);

        let impacto = analisar(Some(&vigente), &atual);
        assert!(impacto.tem_impactos);
        assert_eq!(impacto.total_atividades_alteradas, 2);
        assert_eq!(impacto.atividades_removidas[0].descricao, "Analisar");
        assert_eq!(impacto.atividades_removidas[0].tipo_impacto, TipoImpacto::Removida);
        assert_eq!(impacto.atividades_inseridas[0].descricao, "Analisar contratos");
        assert_eq!(impacto.competencias_impactadas.len(), 1);
        assert_eq!(
            impacto.competencias_impactadas[0].atividades_afetadas,
            vec!["Atividade removida: Analisar", "Atividade inserida: Analisar contratos"]
        );
    }

    #[test]
    fn result_is_independent_of_activity_order() {
        let vigente = mapa(&["A", "B", "C"], &[("X", &["A"]), ("Y", &["B"])]);
        let vigente_invertido = com_conhecimentos(
            mapa(&["C", "B", "A"], &[("Y", &["B"]), ("X", &["A"])]),
            2,
            &["Y", "X"],
        );
        let vigente = com_conhecimentos(vigente, 0, &["X", "Y"]);
        let atual = mapa(&["D", "C"], &[]);
        let atual_invertido = mapa(&["C", "D"], &[]);

        let primeiro = analisar(Some(&vigente), &atual);
        assert_eq!(primeiro, analisar(Some(&vigente), &atual_invertido));
        assert_eq!(primeiro, analisar(Some(&vigente_invertido), &atual_invertido));
        let removidas: Vec<&str> = primeiro
            .atividades_removidas
            .iter()
            .map(|a| a.descricao.as_str())
            .collect();
        assert_eq!(removidas, vec!["A", "B"]);
        assert_eq!(primeiro.atividades_removidas[0].conhecimentos, vec!["X", "Y"]);
    }

    #[test]
    fn same_description_activities_are_merged() {
        let vigente = mapa(&["A", "A", "B"], &[("X", &["A"]), ("Y", &["B"])]);
        let vigente = com_conhecimentos(vigente, 0, &["K2", "K1"]);
        let mut vigente = com_conhecimentos(vigente, 1, &["K1", "K3"]);
        let segunda_a = vigente.atividades[1].id;
        vigente.competencias[1].atividades.push(segunda_a);
        let atual = mapa(&["B"], &[("Y", &["B"])]);

        let impacto = analisar(Some(&vigente), &atual);

        assert_eq!(impacto.total_atividades_alteradas, 1);
        let removida = &impacto.atividades_removidas[0];
        assert_eq!(removida.conhecimentos, vec!["K1", "K2", "K3"]);
        assert_eq!(removida.competencias_vinculadas, vec!["X", "Y"]);
        let afetadas: Vec<&str> = impacto
            .competencias_impactadas
            .iter()
            .map(|c| c.descricao.as_str())
            .collect();
        assert_eq!(afetadas, vec!["X", "Y"]);
        assert_eq!(
            impacto.competencias_impactadas[1].atividades_afetadas,
            vec!["Atividade removida: A"]
        );
    }

    #[test]
    fn descriptions_are_case_sensitive() {
        let vigente = mapa(&["analisar"], &[]);
        let atual = mapa(&["Analisar"], &[]);
        assert_eq!(analisar(Some(&vigente), &atual).total_atividades_alteradas, 2);
    }

    #[test]
    fn identical_maps_have_no_impact() {
        let vigente = mapa(&["A", "B"], &[("X", &["A", "B"])]);
        let atual = mapa(&["B", "A"], &[("X", &["A", "B"])]);
        let impacto = analisar(Some(&vigente), &atual);
        assert!(!impacto.tem_impactos);
        assert!(impacto.competencias_impactadas.is_empty());
    }

    #[test]
    fn projection_uses_camel_case_fields() {
        let json = serde_json::to_value(ImpactoMapa::default()).unwrap();
        assert_eq!(json["temImpactos"], false);
        assert_eq!(json["totalAtividadesAlteradas"], 0);
        assert!(json["competenciasImpactadas"].as_array().unwrap().is_empty());
    }
}

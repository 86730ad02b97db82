mod common;

use common::{admin, chefe, gestor, Cenario, PRAZO_MAPA, SEJUD, SENIC, SESEL};
use sgc_core::{ResultadoUnidade, SituacaoSubprocesso, TipoProcesso};
use uuid::Uuid;

#[test]
fn bulk_acceptance_reports_each_unit_and_keeps_successes() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL, SENIC]);
    let sesel = cenario.subprocesso(&processo, SESEL);
    let senic = cenario.subprocesso(&processo, SENIC);
    cenario.preencher_cadastro(&sesel, "Analisar editais");
    cenario.preencher_cadastro(&senic, "Mapear iniciativas");
    let engine = cenario.engine();
    engine.disponibilizar_cadastro(sesel.id, &chefe(SESEL)).unwrap();

    let relatorio = engine
        .aceitar_cadastro_em_bloco(sesel.id, &[SESEL, SENIC, SEJUD], &gestor())
        .unwrap();

    assert_eq!(relatorio.itens.len(), 3);
    assert_eq!(relatorio.sucessos(), 1);
    assert_eq!(relatorio.falhas(), 2);
    assert_eq!(relatorio.itens[0].unidade, SESEL);
    assert_eq!(
        relatorio.itens[0].resultado,
        ResultadoUnidade::Sucesso {
            situacao: SituacaoSubprocesso::MapeamentoCadastroDisponibilizado
        }
    );
    assert!(matches!(
        relatorio.itens[1].resultado,
        ResultadoUnidade::Falha { status: 409, .. }
    ));
    assert_eq!(relatorio.itens[1].subprocesso_id, Some(senic.id));
    assert!(matches!(
        relatorio.itens[2].resultado,
        ResultadoUnidade::Falha { status: 404, .. }
    ));
    assert_eq!(relatorio.itens[2].subprocesso_id, None);

    assert_eq!(cenario.movimentacoes(sesel.id).len(), 3);
    assert_eq!(cenario.movimentacoes(senic.id).len(), 1);

    let json = serde_json::to_value(&relatorio).unwrap();
    assert_eq!(json["itens"][0]["resultado"], "SUCESSO");
    assert_eq!(json["itens"][1]["resultado"], "FALHA");
    assert_eq!(json["itens"][1]["status"], 409);
    assert_eq!(json["itens"][1]["subprocessoId"], senic.id.to_string());
}

#[test]
fn unknown_context_subprocess_fails_the_whole_call() {
    let cenario = Cenario::novo();
    cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL]);

    let err = cenario
        .engine()
        .homologar_cadastro_em_bloco(Uuid::new_v4(), &[SESEL], &admin())
        .unwrap_err();

    assert_eq!(err.http_status(), 404);
}

#[test]
fn bulk_operations_drive_several_units_to_homologation() {
    let cenario = Cenario::novo();
    let processo = cenario.iniciar(TipoProcesso::Mapeamento, &[SESEL, SENIC]);
    let sesel = cenario.subprocesso(&processo, SESEL);
    let senic = cenario.subprocesso(&processo, SENIC);
    let engine = cenario.engine();
    let mapas = cenario.mapas();
    let unidades = [SESEL, SENIC];

    for sub in [&sesel, &senic] {
        cenario.preencher_cadastro(sub, "Atender demandas");
        engine.disponibilizar_cadastro(sub.id, &chefe(sub.unidade)).unwrap();
    }
    let aceite = engine
        .aceitar_cadastro_em_bloco(senic.id, &unidades, &gestor())
        .unwrap();
    assert_eq!(aceite.sucessos(), 2);
    let homologacao = engine
        .homologar_cadastro_em_bloco(sesel.id, &unidades, &admin())
        .unwrap();
    assert_eq!(homologacao.sucessos(), 2);

    for sub in [&sesel, &senic] {
        let atividades: Vec<_> = mapas
            .obter_conteudo(sub.id, &admin())
            .unwrap()
            .atividades
            .iter()
            .map(|atividade| atividade.id)
            .collect();
        mapas
            .criar_competencia(sub.id, "Atendimento", &atividades, &admin())
            .unwrap();
    }

    let sem_prazo = engine
        .disponibilizar_mapa_em_bloco(sesel.id, &unidades, None, &admin())
        .unwrap();
    assert!(sem_prazo
        .itens
        .iter()
        .all(|item| matches!(item.resultado, ResultadoUnidade::Falha { status: 422, .. })));

    let disponibilizacao = engine
        .disponibilizar_mapa_em_bloco(sesel.id, &unidades, Some(PRAZO_MAPA), &admin())
        .unwrap();
    assert_eq!(disponibilizacao.sucessos(), 2);

    for sub in [&sesel, &senic] {
        engine.validar_mapa(sub.id, &chefe(sub.unidade)).unwrap();
    }
    let aceite = engine
        .aceitar_validacao_em_bloco(sesel.id, &unidades, &gestor())
        .unwrap();
    assert_eq!(aceite.sucessos(), 2);
    let homologacao = engine
        .homologar_validacao_em_bloco(sesel.id, &unidades, &admin())
        .unwrap();

    assert_eq!(homologacao.falhas(), 0);
    for sub in [&sesel, &senic] {
        assert_eq!(
            cenario.atual(sub.id).situacao,
            SituacaoSubprocesso::MapeamentoMapaHomologado
        );
    }
}
